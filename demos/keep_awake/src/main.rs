use std::time::Duration;

use wakeguard::core::tasks;
use wakeguard::prelude::*;

const DEFAULT_SECONDS: u64 = 60;

fn main() -> anyhow::Result<()> {
    // keep_awake [seconds] [x11 window id, hex]
    let mut args = std::env::args().skip(1);
    let seconds = match args.next() {
        Some(arg) => arg.parse()?,
        None => DEFAULT_SECONDS,
    };
    let window = match args.next() {
        Some(arg) => WindowHandle::x11(u32::from_str_radix(arg.trim_start_matches("0x"), 16)?),
        None => WindowHandle::default(),
    };

    tasks::init(TasksConfig::default());

    // The log filter comes from the settings, so they load before the logger
    let settings = tasks::block_on(SettingsRegistry::new())?;
    let env = match settings.get().general.log_filter() {
        Some(filter) => env_logger::Env::default().default_filter_or(filter),
        None => env_logger::Env::default(),
    };
    env_logger::Builder::from_env(env).init();

    let config = PowerSaveConfig::from_settings(settings.get());
    log::info!("Platform: {:?}, config: {:?}", Platform::detect(), config);

    let mut blocker = PowerSaveBlocker::new(config);
    for block_type in [PowerSaveBlockType::PreventAppSuspension, PowerSaveBlockType::PreventDisplaySleep] {
        let outcome = blocker.block_power_save(block_type, "keep_awake demo", &window);
        println!("{:?}: {:?}", block_type, outcome);
    }

    println!("Staying awake for {} seconds...", seconds);
    tasks::block_on(tokio::time::sleep(Duration::from_secs(seconds)));

    for block_type in [PowerSaveBlockType::PreventAppSuspension, PowerSaveBlockType::PreventDisplaySleep] {
        let outcome = blocker.unblock_power_save(block_type, &window);
        println!("{:?} released: {:?}", block_type, outcome);
    }

    drop(blocker);
    tasks::shutdown();
    Ok(())
}
