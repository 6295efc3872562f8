//! inference-bench CLI entry point.

#[tokio::main]
async fn main() {
    match inference_bench_cli::run().await {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    }
}
