use log::error;

/// Log an error together with its full context chain and hand it back.
pub fn handle_error(error: anyhow::Error) -> anyhow::Error {
    let mut message = format!("{error}");
    for cause in error.chain().skip(1) {
        message.push_str(&format!("\n  caused by: {cause}"));
    }
    error!("{message}");
    error
}
