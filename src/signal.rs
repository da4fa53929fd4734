use {super::*, tokio::signal::ctrl_c};

/// First ctrl-c cancels the root token so in-flight searches unwind at
/// their next poll; a second one exits without waiting for them.
pub(crate) fn setup_signal_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let handler_token = token.clone();

    tokio::spawn(async move {
        if ctrl_c().await.is_ok() {
            info!("received shutdown signal, waiting for workers to unwind");
            handler_token.cancel();

            if ctrl_c().await.is_ok() {
                warn!("received second shutdown signal, exiting immediately");
                process::exit(130);
            }
        }
    });

    token
}
