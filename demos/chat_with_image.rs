use ollama_relay::{OllamaClient, OllamaConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let image_url = std::env::args().nth(1).unwrap_or_else(|| {
        eprintln!("Usage: chat_with_image <image_url> [model]");
        std::process::exit(1);
    });

    let model = std::env::args()
        .nth(2)
        .unwrap_or_else(|| "qwen2.5vl:3b".to_string());
    let client = OllamaClient::new(OllamaConfig::with_model(&model));

    println!("Asking '{}' about {}...", model, image_url);

    let answer = client
        .chat_with_image("Describe this image in one sentence.", None, Some(&image_url))
        .await?;

    println!("{}", answer);
    Ok(())
}
