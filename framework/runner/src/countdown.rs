use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::shutdown::ShutdownListener;

/// Count down before a long running step starts, so it can still be cancelled with Ctrl-C.
///
/// Returns `true` once the countdown has run out, `false` if a shutdown was requested first. A
/// countdown of zero seconds returns `true` straight away.
pub async fn countdown_confirm(prompt: &str, seconds: u64, shutdown: &mut ShutdownListener) -> bool {
    if seconds == 0 {
        return true;
    }

    println!("{prompt}");
    let bar = ProgressBar::new(seconds);
    bar.set_style(
        ProgressStyle::with_template("{spinner:.yellow} Starting in {msg}s, press Ctrl-C to cancel")
            .expect("Failed to set countdown style"),
    );

    let countdown = async {
        for remaining in (1..=seconds).rev() {
            bar.set_message(remaining.to_string());
            bar.tick();
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    };

    let confirmed = tokio::select! {
        _ = countdown => true,
        _ = shutdown.wait_for_shutdown() => false,
    };
    bar.finish_and_clear();

    if confirmed {
        log::info!("Countdown finished, starting");
    } else {
        log::info!("Cancelled during countdown");
    }

    confirmed
}
