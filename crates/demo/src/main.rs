//! Minimal agent: connect to a running Minecraft instance with the MCio mod
//! in sync mode, walk forward for a while sweeping the camera, then read back
//! the stat counters. Start Minecraft first; this binary only drives it.

use std::time::Duration;

use anyhow::Result;

use mcio_remote::env::{MinerlAction, MinerlEnv, MinerlSpace, ResetOptions, RunOptions, StatsCache};
use mcio_remote::net::{ActionPacket, McioMode};

const STEPS: u32 = 200;

fn main() -> Result<()> {
    env_logger::init();

    let options = RunOptions {
        mode: McioMode::Sync,
        connection_timeout: Some(Duration::from_secs(30)),
        ..RunOptions::default()
    };
    let mut env = MinerlEnv::new(MinerlSpace::new(), options);

    let reset_options = ResetOptions {
        commands: vec!["time set day".into()],
    };
    env.reset(reset_options)?;
    // Commands can take a while to land in the world; let them settle.
    env.skip_steps(25)?;

    for step in 0..STEPS {
        let action = MinerlAction {
            forward: true,
            jump: step % 20 == 0,
            camera: (0.0, if step % 50 < 25 { 2.0 } else { -2.0 }),
            ..MinerlAction::default()
        };
        let outcome = env.step(&action)?;
        if step % 25 == 0 {
            log::info!(
                "step {step}: health={:.1} pitch={:.1} yaw={:.1}",
                env.state().health,
                env.space().last_pitch,
                env.space().last_yaw
            );
        }
        if outcome.terminated {
            log::warn!("episode terminated at step {step}");
            break;
        }
    }

    let mut stats = StatsCache::new();
    let observation = env.step_raw(ActionPacket::default())?;
    stats.update(&observation);
    log::info!(
        "walked {} cm this session",
        stats.get("minecraft:custom", "minecraft:walk_one_cm")
    );

    env.close();
    Ok(())
}
