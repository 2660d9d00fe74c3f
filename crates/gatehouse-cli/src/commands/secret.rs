//! Secret generation commands.

use anyhow::{bail, Result};
use console::style;

use gatehouse_common::crypto;
use gatehouse_common::jwt::{sign_hs256, SessionClaims};

/// Generates a random 256-bit secret, hex encoded.
#[allow(clippy::unnecessary_wraps)]
pub fn generate_jwt_secret() -> Result<()> {
    use rand::Rng;
    let mut rng = rand::thread_rng();
    let bytes: Vec<u8> = (0..32).map(|_| rng.gen::<u8>()).collect();
    let secret = hex::encode(&bytes);

    println!("{}", style("Generated secret:").bold().green());
    println!();
    println!("{secret}");
    println!();
    println!(
        "{}",
        style("Use as GATEHOUSE_SIGNING_KEY or GATEHOUSE_SESSION_SECRET.").dim()
    );

    Ok(())
}

/// Prints the at-rest hash of a client secret.
#[allow(clippy::unnecessary_wraps)]
pub fn hash_client_secret(secret: &str) -> Result<()> {
    let hash = crypto::hash_client_secret(secret);

    println!("{}", style("Client secret hash:").bold().green());
    println!();
    println!("{hash}");
    println!();
    println!(
        "{}",
        style("Store this in the client's secret_hash column.").dim()
    );

    Ok(())
}

/// Mints a session token naming `user_id`.
///
/// # Errors
/// Returns an error if the secret is empty or signing fails.
pub fn mint_session(user_id: i64, session_secret: &str, ttl: u64) -> Result<()> {
    if session_secret.is_empty() {
        bail!("session secret is empty");
    }

    let claims = SessionClaims::new("gatehouse", user_id.to_string(), ttl);
    let token = sign_hs256(&claims, session_secret.as_bytes())?;

    println!("{}", style("Session token:").bold().green());
    println!();
    println!("{token}");
    println!();
    println!(
        "{}",
        style("Send as `Authorization: Bearer <token>` to /connect/authorize.").dim()
    );

    Ok(())
}
