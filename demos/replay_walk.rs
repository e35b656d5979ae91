//! Replay a short walk-then-run session and print the emitted commands

use gait_flux::wire::encode_command;
use gait_flux::{replay_samples, GaitConfig, Sample};

fn main() {
    let mut samples = vec![Sample::new(0.0, 10.0, 0.0)];
    let mut t = 0.0;

    // One step per second at walking energy, then faster and harder
    for _ in 0..5 {
        t += 1.0;
        samples.push(Sample::new(t, 260.0, 20.0));
    }
    for _ in 0..5 {
        t += 0.6;
        samples.push(Sample::new(t, 700.0, 40.0));
    }

    match replay_samples(&samples, GaitConfig::default()) {
        Ok(commands) => {
            for command in &commands {
                match encode_command(command) {
                    Ok(line) => println!("{line}"),
                    Err(e) => eprintln!("Error: {e:?}"),
                }
            }
        }
        Err(e) => eprintln!("Error: {e:?}"),
    }
}
