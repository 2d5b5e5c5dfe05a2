use std::fs::File;
use std::io::Read as _;
use std::path::Path;

const DOCKER_SECRETS_PATH: &str = "/run/secrets/";

pub fn read_secret(name: &str) -> Result<String, std::io::Error> {
    let mut secret_val = String::new();
    File::open(Path::new(DOCKER_SECRETS_PATH).join(name.to_lowercase()))?
        .read_to_string(&mut secret_val)?;
    Ok(secret_val.trim_end().to_owned())
}

/// Read an optional secret, first from the named environment variable and then
/// from the Docker secret named by `<name>_DOCKER_SECRET`.
pub fn optional_secret(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .filter(|value| !value.is_empty())
        .or_else(|| {
            let secret_path = std::env::var(format!("{name}_DOCKER_SECRET")).ok()?;
            read_secret(&secret_path)
                .map_err(|err| {
                    tracing::warn!(secret = name, error = %err, "Failed to read docker secret");
                })
                .ok()
        })
}
