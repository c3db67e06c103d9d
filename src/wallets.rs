use alloy::signers::local::PrivateKeySigner;
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use eth_keystore::decrypt_key;
use rpassword::prompt_password;
use std::{
    fs,
    path::{
        Path,
        PathBuf,
    },
};

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KeystoreDescriptor {
    pub name: String,
    pub path: PathBuf,
}

impl KeystoreDescriptor {
    pub fn new(name: impl Into<String>, path: PathBuf) -> Self {
        Self {
            name: name.into(),
            path,
        }
    }
}

pub fn default_keystore_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").wrap_err("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".foundry").join("keystores"))
}

pub fn resolve_keystore_dir(dir: Option<&str>) -> Result<PathBuf> {
    match dir {
        Some(raw) => Ok(PathBuf::from(shellexpand::tilde(raw).into_owned())),
        None => default_keystore_dir(),
    }
}

/// Keystore files in `dir`, sorted by name. Hidden files are skipped.
pub fn list_keystores(dir: &Path) -> Result<Vec<KeystoreDescriptor>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut keystores = Vec::new();
    for entry in fs::read_dir(dir).wrap_err("Failed to read keystore directory")? {
        let path = entry.wrap_err("Failed to read keystore entry")?.path();
        if !path.is_file() {
            continue;
        }
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| eyre!("Invalid keystore filename {:?}", path))?
            .to_owned();
        if name.starts_with('.') {
            continue;
        }
        keystores.push(KeystoreDescriptor::new(name, path));
    }
    keystores.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(keystores)
}

/// `name` is either a path to a keystore file or the name of one in `dir`.
pub fn find_keystore(dir: &Path, name: &str) -> Result<KeystoreDescriptor> {
    let expanded = PathBuf::from(shellexpand::tilde(name).into_owned());
    if expanded.is_file() {
        let label = expanded
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(name)
            .to_owned();
        return Ok(KeystoreDescriptor::new(label, expanded));
    }
    list_keystores(dir)?
        .into_iter()
        .find(|k| k.name == name)
        .ok_or_else(|| eyre!("Keystore '{name}' not found in {}", dir.to_string_lossy()))
}

pub fn unlock_keystore(descriptor: &KeystoreDescriptor) -> Result<PrivateKeySigner> {
    let prompt = format!("Enter password for keystore '{}': ", descriptor.name);
    let password = prompt_password(prompt).wrap_err("Failed to read keystore password")?;
    decrypt_keystore(descriptor, &password)
}

pub fn decrypt_keystore(
    descriptor: &KeystoreDescriptor,
    password: &str,
) -> Result<PrivateKeySigner> {
    let secret = decrypt_key(&descriptor.path, password.as_bytes())
        .map_err(|_| eyre!("Invalid password for keystore '{}'", descriptor.name))?;
    PrivateKeySigner::from_slice(&secret).map_err(|e| {
        eyre!(
            "Keystore '{}' contained unsupported key material: {e}",
            descriptor.name
        )
    })
}

/// Read a hex private key, with or without `0x`, from the environment.
pub fn signer_from_env(var: &str) -> Result<PrivateKeySigner> {
    let raw = std::env::var(var).wrap_err_with(|| format!("{var} is not set"))?;
    signer_from_hex(&raw).wrap_err_with(|| format!("{var} does not hold a private key"))
}

pub fn signer_from_hex(raw: &str) -> Result<PrivateKeySigner> {
    let trimmed = raw.trim();
    let digits = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let bytes = hex::decode(digits).wrap_err("Private key is not valid hex")?;
    PrivateKeySigner::from_slice(&bytes).map_err(|e| eyre!("Invalid private key: {e}"))
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use alloy::primitives::address;
    use tempdir::TempDir;

    // First Hardhat development account.
    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    #[test]
    fn signer_from_hex__accepts_prefixed_and_bare_keys() {
        let prefixed = signer_from_hex(DEV_KEY).unwrap();
        let bare = signer_from_hex(&DEV_KEY[2..]).unwrap();

        assert_eq!(
            prefixed.address(),
            address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266")
        );
        assert_eq!(prefixed.address(), bare.address());
    }

    #[test]
    fn signer_from_hex__rejects_garbage() {
        assert!(signer_from_hex("0xnothex").is_err());
        assert!(signer_from_hex("0x1234").is_err());
    }

    #[test]
    fn list_keystores__sorted_and_skips_hidden_files() {
        // given
        let dir = TempDir::new("keystores").unwrap();
        fs::write(dir.path().join("bob"), "{}").unwrap();
        fs::write(dir.path().join("alice"), "{}").unwrap();
        fs::write(dir.path().join(".DS_Store"), "").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();

        // when
        let found = list_keystores(dir.path()).unwrap();

        // then
        let names: Vec<_> = found.iter().map(|k| k.name.as_str()).collect();
        assert_eq!(names, vec!["alice", "bob"]);
    }

    #[test]
    fn list_keystores__missing_dir_is_empty() {
        let dir = TempDir::new("keystores").unwrap();

        let found = list_keystores(&dir.path().join("absent")).unwrap();

        assert!(found.is_empty());
    }

    #[test]
    fn find_keystore__by_name_or_path() {
        // given
        let dir = TempDir::new("keystores").unwrap();
        let path = dir.path().join("deployer");
        fs::write(&path, "{}").unwrap();

        // when
        let by_name = find_keystore(dir.path(), "deployer").unwrap();
        let by_path = find_keystore(Path::new("/nonexistent"), path.to_str().unwrap()).unwrap();

        // then
        assert_eq!(by_name.path, path);
        assert_eq!(by_path, by_name);
        assert!(find_keystore(dir.path(), "missing").is_err());
    }

    #[test]
    fn decrypt_keystore__unreadable_file_reports_keystore_name() {
        let dir = TempDir::new("keystores").unwrap();
        let path = dir.path().join("broken");
        fs::write(&path, "not a keystore").unwrap();
        let descriptor = KeystoreDescriptor::new("broken", path);

        let err = decrypt_keystore(&descriptor, "hunter2").unwrap_err();

        assert!(err.to_string().contains("'broken'"));
    }
}
