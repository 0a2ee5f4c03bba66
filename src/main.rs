use log::{error, info, warn};
use std::time::Duration;

use tokio_stream::StreamExt;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use pinctl::backend::backend_for;
use pinctl::{AppConfig, Chase, EventBroadcaster, Gpio, GpioError};

#[tokio::main]
async fn main() {
    env_logger::init();

    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("PINCTL_CONFIG").ok())
        .unwrap_or_else(|| "config.json".to_string());
    let config = AppConfig::load_from_file(&config_path)
        .unwrap_or_else(|e| panic!("Failed to load config: {e}"));

    let gpio = Gpio::new(backend_for(&config.gpio), &config.gpio)
        .unwrap_or_else(|e| panic!("Failed to init gpio: {e}"));

    let result = run(&gpio, &config).await;

    for (id, released) in gpio.release_all() {
        if let Err(e) = released {
            warn!("release gpio{id}: {e}");
        }
    }

    if let Err(e) = result {
        error!("{e}");
        std::process::exit(1);
    }
}

async fn run(gpio: &Gpio, config: &AppConfig) -> Result<(), GpioError> {
    let _runner = gpio.events().start();
    let broadcaster = EventBroadcaster::new(config.chase.event_capacity);
    let mut events = broadcaster.stream();

    let _watcher = match config.chase.input {
        Some(id) => {
            info!("Listening on gpio{id}");
            Some(gpio.line(id)?.listen(broadcaster.callback(id))?)
        }
        None => None,
    };

    let mut chase = Chase::new(gpio, &config.chase.leds)?;
    chase.all_up()?;
    info!("Started chase on {} leds", chase.leds().len());

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    tokio::select! {
        _ = tokio::time::sleep(Duration::from_millis(config.chase.start_delay_ms)) => {}
        _ = &mut shutdown => return Ok(()),
    }
    chase.all_down()?;

    let mut ticker = tokio::time::interval(Duration::from_millis(config.chase.step_ms));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                chase.step()?;
            }
            event = events.next() => {
                match event {
                    Some(Ok(event)) => info!("NEW VALUE = {}", event.value),
                    Some(Err(BroadcastStreamRecvError::Lagged(n))) => {
                        warn!("dropped {n} events from gpio listener");
                    }
                    None => break,
                }
            }
            _ = &mut shutdown => {
                info!("Shutting down...");
                break;
            }
        }
    }

    Ok(())
}
