use std::{io::Write, sync::Arc, time::Duration};

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::{persistence::StateStorage, store::ActivityStore, utils::clock::Clock};

use super::output::render_tiles;

const REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// Clears the terminal and moves the cursor home.
const CLEAR_SCREEN: &str = "\x1B[2J\x1B[H";

/// Re-renders the tiles once per [REFRESH_INTERVAL] until Ctrl-C. Every frame reloads the state, so
/// changes made from another terminal show up. Nothing is ever written back.
pub async fn watch(
    storage: &impl StateStorage,
    clock: Arc<dyn Clock>,
    coloured: bool,
) -> Result<()> {
    let shutdown = CancellationToken::new();
    let mut stdout = std::io::stdout();
    let render = render_loop(storage, clock, coloured, &mut stdout, shutdown.clone());
    tokio::pin!(render);

    tokio::select! {
        result = &mut render => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Interrupted, leaving watch mode");
            shutdown.cancel();
            render.await
        }
    }
}

async fn render_loop(
    storage: &impl StateStorage,
    clock: Arc<dyn Clock>,
    coloured: bool,
    out: &mut impl Write,
    shutdown: CancellationToken,
) -> Result<()> {
    let mut frame = clock.instant();
    loop {
        frame += REFRESH_INTERVAL;

        let store = ActivityStore::new(storage.load().await?, clock.clone());
        write!(out, "{CLEAR_SCREEN}{}", render_tiles(&store, coloured))?;
        out.flush()?;
        debug!("Rendered {} activities", store.activities().len());

        tokio::select! {
            _ = shutdown.cancelled() => {
                return Ok(())
            }
            _ = clock.sleep_until(frame) => ()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use anyhow::Result;
    use chrono::{TimeZone, Utc};
    use tokio_util::sync::CancellationToken;

    use crate::{
        persistence::MockStateStorage,
        store::entities::StoreState,
        utils::{clock::ManualClock, logging::TEST_LOGGING},
    };

    use super::render_loop;

    #[tokio::test]
    async fn stops_after_cancellation() -> Result<()> {
        *TEST_LOGGING;
        let mut storage = MockStateStorage::new();
        storage
            .expect_load()
            .times(1)
            .returning(|| Ok(StoreState::default()));
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 4, 5, 12, 0, 0).unwrap());
        let shutdown = CancellationToken::new();
        shutdown.cancel();

        let mut out = Vec::new();
        render_loop(&storage, Arc::new(clock), false, &mut out, shutdown).await?;

        let out = String::from_utf8(out)?;
        assert!(out.contains("No activities yet"));
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn renders_once_per_interval() -> Result<()> {
        let mut storage = MockStateStorage::new();
        storage
            .expect_load()
            .times(3)
            .returning(|| Ok(StoreState::default()));
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 4, 5, 12, 0, 0).unwrap());
        let shutdown = CancellationToken::new();

        let mut out = Vec::new();
        let cancel = shutdown.clone();
        let (result, _) = tokio::join!(
            render_loop(&storage, Arc::new(clock), false, &mut out, shutdown),
            async move {
                tokio::time::sleep(Duration::from_millis(2500)).await;
                cancel.cancel();
            }
        );
        result?;

        assert_eq!(String::from_utf8(out)?.matches("No activities yet").count(), 3);
        Ok(())
    }
}
