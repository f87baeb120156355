#[tokio::main]
async fn main() {
    if let Err(error) = update_notifier_lib::run().await {
        eprintln!("update-notifier failed to start: {error}");
        std::process::exit(1);
    }
}
