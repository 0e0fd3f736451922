use std::time::SystemTime;

use tempotp::{Config, Totp};

pub fn main() -> anyhow::Result<()> {
    // Initialize the TOTP with the defaults (SHA1 hash, 6-digits, 30 seconds period, window of 1)
    let totp = Totp::new("HXDMVJECJJWSRB3HWIZR4IFUGFTMXBOZ", Config::default())?;

    // Calculate time since Unix Epoch
    let now = SystemTime::now();
    let time_since_epoch = now.duration_since(SystemTime::UNIX_EPOCH)?;

    // Generate the code with the seconds
    let code = totp.generate(time_since_epoch.as_secs());

    // Print the code
    println!(
        "Code: {}, Remaining time: {}",
        code,
        totp.remaining_seconds(time_since_epoch.as_secs())
    );

    // A code typed a period late is still accepted with the default window
    let late = time_since_epoch.as_secs() + totp.config().period();
    println!("Valid one period later: {}", totp.verify(&code.to_string(), late));

    Ok(())
}
