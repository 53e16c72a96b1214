//! Basic-auth credential store.
//!
//! # Security Features
//!
//! - **htpasswd formats**: bcrypt (`$2a$`, `$2b$`, `$2x$`, `$2y$`), Apache MD5
//!   (`$apr1$`), MD5-crypt (`$1$`) and SHA-1 (`{SHA}`), plus Argon2 PHC strings
//! - **Strict parsing**: a malformed `name:secret` line aborts construction, so
//!   a typo can never silently admit a partial user set
//! - **User enumeration protection**: unknown users are checked against the
//!   most expensive configured secret, and every failed check is padded to
//!   that secret's measured cost, so neither the user's existence nor the
//!   format of their secret shows in failure timing
//! - **Constant-time comparison**: digest formats compare with `subtle`
//! - **Memory cleanup**: candidate passwords are held in `Zeroizing` buffers
//!
//! # Line Format
//!
//! ```text
//! alice:$apr1$Jr5S8Bhm$UYsNM4UIAk3veeslKR2O41
//! bob:{SHA}AMr9EmGC6KnnwBuy8N/QBJa+ck8=
//! ```
//!
//! Each line must contain exactly one `:` with a non-empty name on the left
//! and a non-empty secret on the right. Generate entries with
//! `htpasswd -nbB user password` (bcrypt) or `htpasswd -nbm user password`.

use std::collections::HashMap;
use std::fmt;
use std::time::{Duration, Instant};

use argon2::password_hash::PasswordHash;
use argon2::{Argon2, Params, PasswordVerifier as _};
use bcrypt::HashParts;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use md5::{Digest as _, Md5};
use sha1::Sha1;
use subtle::ConstantTimeEq;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::config::BasicAuthConfig;
use crate::error::{GateError, GateResult};

/// Alphabet of the crypt(3) base-64 encoding.
const CRYPT_ALPHABET: &[u8; 64] =
    b"./0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// MD5-crypt salts are truncated to this many characters.
const MD5_CRYPT_MAX_SALT: usize = 8;

/// Length of the encoded MD5-crypt digest.
const MD5_CRYPT_DIGEST_LEN: usize = 22;

const MD5_CRYPT_ROUNDS: usize = 1000;

/// Length of a SHA-1 digest.
const SHA1_LEN: usize = 20;

/// Costs bcrypt accepts.
const BCRYPT_COSTS: std::ops::RangeInclusive<u32> = 4..=31;

/// Password fed to the decoy when measuring its cost.
const DECOY_PASSWORD: &[u8] = b"decoy-password";

/// Flavor of MD5-crypt, distinguished only by the magic prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Md5Variant {
    /// Apache `$apr1$`
    Apr1,
    /// FreeBSD/glibc `$1$`
    Crypt,
}

impl Md5Variant {
    fn magic(self) -> &'static str {
        match self {
            Md5Variant::Apr1 => "$apr1$",
            Md5Variant::Crypt => "$1$",
        }
    }
}

/// Stored representation of a user's password.
#[derive(Clone, PartialEq, Eq)]
pub enum Secret {
    Bcrypt {
        hash: String,
        cost: u32,
    },
    Argon2(String),
    Md5Crypt {
        variant: Md5Variant,
        salt: String,
        digest: String,
    },
    Sha1([u8; SHA1_LEN]),
    /// Unrecognized format; never verifies.
    Unsupported,
}

impl Secret {
    /// Classify and validate a raw secret string.
    ///
    /// # Errors
    ///
    /// Returns `GateError::InvalidSecret` when the prefix names a known format
    /// but the rest of the string is corrupt.
    pub fn parse(user: &str, raw: &str) -> GateResult<Self> {
        let invalid = |reason: &str| GateError::InvalidSecret {
            user: user.to_string(),
            reason: reason.to_string(),
        };

        if ["$2a$", "$2b$", "$2x$", "$2y$"]
            .iter()
            .any(|prefix| raw.starts_with(prefix))
        {
            let parts = raw
                .parse::<HashParts>()
                .map_err(|e| invalid(&format!("bad bcrypt hash: {e}")))?;
            let cost = parts.get_cost();
            if !BCRYPT_COSTS.contains(&cost) {
                return Err(invalid(&format!("bcrypt cost {cost} out of range")));
            }
            return Ok(Secret::Bcrypt {
                hash: raw.to_string(),
                cost,
            });
        }

        if raw.starts_with("$argon2") {
            PasswordHash::new(raw).map_err(|e| invalid(&format!("bad Argon2 hash: {e}")))?;
            return Ok(Secret::Argon2(raw.to_string()));
        }

        for variant in [Md5Variant::Apr1, Md5Variant::Crypt] {
            if let Some(rest) = raw.strip_prefix(variant.magic()) {
                let (salt, digest) = rest
                    .split_once('$')
                    .ok_or_else(|| invalid("missing '$' between salt and digest"))?;
                if digest.len() != MD5_CRYPT_DIGEST_LEN {
                    return Err(invalid("MD5 digest must be 22 characters"));
                }
                let salt = salt.get(..MD5_CRYPT_MAX_SALT).unwrap_or(salt);
                return Ok(Secret::Md5Crypt {
                    variant,
                    salt: salt.to_string(),
                    digest: digest.to_string(),
                });
            }
        }

        if let Some(encoded) = raw.strip_prefix("{SHA}") {
            let decoded = BASE64
                .decode(encoded)
                .map_err(|e| invalid(&format!("bad base64 in {{SHA}} secret: {e}")))?;
            let digest: [u8; SHA1_LEN] = decoded
                .try_into()
                .map_err(|_| invalid("{SHA} digest must be 20 bytes"))?;
            return Ok(Secret::Sha1(digest));
        }

        warn!(user, "Unknown password hash format, user can never authenticate");
        Ok(Secret::Unsupported)
    }

    /// Short name of the format, safe to log.
    pub fn kind(&self) -> &'static str {
        match self {
            Secret::Bcrypt { .. } => "bcrypt",
            Secret::Argon2(_) => "argon2",
            Secret::Md5Crypt {
                variant: Md5Variant::Apr1,
                ..
            } => "apr1",
            Secret::Md5Crypt {
                variant: Md5Variant::Crypt,
                ..
            } => "md5-crypt",
            Secret::Sha1(_) => "sha1",
            Secret::Unsupported => "unsupported",
        }
    }

    /// Work factor within one format; higher is slower.
    fn work_factor(&self) -> u64 {
        match self {
            Secret::Bcrypt { cost, .. } => u64::from(*cost),
            Secret::Argon2(phc) => PasswordHash::new(phc)
                .ok()
                .and_then(|hash| Params::try_from(&hash).ok())
                .map_or(0, |params| {
                    u64::from(params.m_cost())
                        * u64::from(params.t_cost())
                        * u64::from(params.p_cost())
                }),
            Secret::Md5Crypt { .. } | Secret::Sha1(_) | Secret::Unsupported => 0,
        }
    }

    /// Check a candidate password against this secret.
    pub fn verify(&self, password: &[u8]) -> bool {
        match self {
            Secret::Bcrypt { hash, .. } => match bcrypt::verify(password, hash) {
                Ok(verified) => verified,
                Err(e) => {
                    warn!(error = %e, "bcrypt verification error");
                    false
                }
            },
            Secret::Argon2(phc) => match PasswordHash::new(phc) {
                Ok(hash) => Argon2::default().verify_password(password, &hash).is_ok(),
                Err(e) => {
                    warn!(error = %e, "Argon2 verification error");
                    false
                }
            },
            Secret::Md5Crypt {
                variant,
                salt,
                digest,
            } => {
                let computed = md5_crypt(password, salt.as_bytes(), variant.magic().as_bytes());
                computed.as_bytes().ct_eq(digest.as_bytes()).into()
            }
            Secret::Sha1(expected) => {
                let computed = Sha1::digest(password);
                computed.as_slice().ct_eq(expected.as_slice()).into()
            }
            Secret::Unsupported => false,
        }
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret({})", self.kind())
    }
}

/// MD5-crypt digest (`$1$` / `$apr1$`), crypt(3)-encoded.
// Indices are constants below 16 or masked to 6 bits.
#[allow(clippy::indexing_slicing)]
fn md5_crypt(password: &[u8], salt: &[u8], magic: &[u8]) -> String {
    let mut ctx = Md5::new();
    ctx.update(password);
    ctx.update(magic);
    ctx.update(salt);

    let mut alt = Md5::new();
    alt.update(password);
    alt.update(salt);
    alt.update(password);
    let alt = alt.finalize();

    for chunk_start in (0..password.len()).step_by(16) {
        let take = (password.len() - chunk_start).min(16);
        ctx.update(alt.get(..take).unwrap_or_default());
    }

    let first = password.get(..1).unwrap_or_default();
    let mut bits = password.len();
    while bits > 0 {
        if bits & 1 == 1 {
            ctx.update([0u8]);
        } else {
            ctx.update(first);
        }
        bits >>= 1;
    }

    let mut result = [0u8; 16];
    result.copy_from_slice(&ctx.finalize());

    for round in 0..MD5_CRYPT_ROUNDS {
        let mut ctx = Md5::new();
        if round & 1 == 1 {
            ctx.update(password);
        } else {
            ctx.update(result);
        }
        if round % 3 != 0 {
            ctx.update(salt);
        }
        if round % 7 != 0 {
            ctx.update(password);
        }
        if round & 1 == 1 {
            ctx.update(result);
        } else {
            ctx.update(password);
        }
        result.copy_from_slice(&ctx.finalize());
    }

    let mut encoded = String::with_capacity(MD5_CRYPT_DIGEST_LEN);
    let mut push = |mut value: u32, chars: usize| {
        for _ in 0..chars {
            encoded.push(char::from(CRYPT_ALPHABET[(value & 0x3f) as usize]));
            value >>= 6;
        }
    };
    for (a, b, c) in [(0, 6, 12), (1, 7, 13), (2, 8, 14), (3, 9, 15), (4, 10, 5)] {
        let value =
            (u32::from(result[a]) << 16) | (u32::from(result[b]) << 8) | u32::from(result[c]);
        push(value, 4);
    }
    push(u32::from(result[11]), 2);

    encoded
}

/// Split a `name:secret` line.
///
/// `line_number` is 1-based and only used for error reporting; the line
/// content is never echoed back since it carries a secret.
pub fn parse_user_line(line_number: usize, line: &str) -> GateResult<(String, Secret)> {
    let line = line.trim();
    let mut fields = line.split(':');

    let (Some(name), Some(secret), None) = (fields.next(), fields.next(), fields.next()) else {
        return Err(GateError::InvalidCredentialLine {
            line_number,
            reason: "expected exactly one ':' between name and secret".to_string(),
        });
    };

    if name.is_empty() || secret.is_empty() {
        return Err(GateError::InvalidCredentialLine {
            line_number,
            reason: "name and secret must both be non-empty".to_string(),
        });
    }

    Ok((name.to_string(), Secret::parse(name, secret)?))
}

/// Collect credential lines: users file first, then inline users.
///
/// Blank lines and `#` comments in the file are skipped.
///
/// # Errors
///
/// Returns `GateError::UsersFile` if the configured file cannot be read.
pub async fn load_users(config: &BasicAuthConfig) -> GateResult<Vec<String>> {
    let mut lines = Vec::new();

    if let Some(ref path) = config.users_file {
        let content =
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| GateError::UsersFile {
                    path: path.clone(),
                    source,
                })?;

        lines.extend(
            content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(String::from),
        );
        debug!(path = %path.display(), count = lines.len(), "Loaded users file");
    }

    lines.extend(config.users.iter().cloned());
    Ok(lines)
}

/// Pick the slowest configured secret and measure one verification of it.
///
/// Only the highest work factor of each format is timed, so startup pays
/// for at most one hash per format.
fn select_decoy(users: &HashMap<String, Secret>) -> Option<(Secret, Duration)> {
    let mut per_kind: HashMap<&'static str, &Secret> = HashMap::new();
    for secret in users.values().filter(|s| **s != Secret::Unsupported) {
        per_kind
            .entry(secret.kind())
            .and_modify(|current| {
                if secret.work_factor() > current.work_factor() {
                    *current = secret;
                }
            })
            .or_insert(secret);
    }

    per_kind
        .into_values()
        .map(|secret| {
            let start = Instant::now();
            let _ = secret.verify(DECOY_PASSWORD);
            (secret.clone(), start.elapsed())
        })
        .max_by_key(|(_, cost)| *cost)
}

/// Immutable username → secret map.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    users: HashMap<String, Secret>,
    /// Verified in place of a missing user's secret.
    decoy: Option<Secret>,
    /// Minimum duration of every failed verification.
    failure_floor: Duration,
}

impl CredentialStore {
    /// Build a store from `name:secret` lines.
    ///
    /// Later lines override earlier ones for the same name.
    ///
    /// # Errors
    ///
    /// Any malformed line fails the whole build.
    pub fn from_lines<I, S>(lines: I) -> GateResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut users = HashMap::new();

        for (index, line) in lines.into_iter().enumerate() {
            let (name, secret) = parse_user_line(index + 1, line.as_ref())?;
            debug!(user = %name, kind = secret.kind(), "Loaded user");

            if users.insert(name.clone(), secret).is_some() {
                debug!(user = %name, "Duplicate user, later entry wins");
            }
        }

        let (decoy, failure_floor) = match select_decoy(&users) {
            Some((decoy, floor)) => {
                debug!(
                    kind = decoy.kind(),
                    floor_ms = floor.as_secs_f64() * 1000.0,
                    "Decoy secret selected"
                );
                (Some(decoy), floor)
            }
            None => (None, Duration::ZERO),
        };

        Ok(Self {
            users,
            decoy,
            failure_floor,
        })
    }

    /// Build a store from the basic-auth configuration.
    pub async fn from_config(config: &BasicAuthConfig) -> GateResult<Self> {
        let store = Self::from_lines(load_users(config).await?)?;
        info!(user_count = store.len(), "Users loaded for basic authentication");
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn contains_user(&self, user: &str) -> bool {
        self.users.contains_key(user)
    }

    /// Minimum time a failed [`CredentialStore::verify`] takes.
    pub fn failure_floor(&self) -> Duration {
        self.failure_floor
    }

    /// Verify a username/password pair.
    ///
    /// An unknown user and a wrong password fail the same way: unknown users
    /// are run through the decoy secret, and every failure is padded to
    /// [`CredentialStore::failure_floor`]. Blocks the calling thread, so
    /// async callers should go through `spawn_blocking`.
    pub fn verify(&self, user: &str, password: &str) -> bool {
        let start = Instant::now();
        let verified = self.check(user, password);
        if !verified
            && let Some(remaining) = self.failure_floor.checked_sub(start.elapsed())
        {
            std::thread::sleep(remaining);
        }
        verified
    }

    fn check(&self, user: &str, password: &str) -> bool {
        let password = Zeroizing::new(password.as_bytes().to_vec());

        match self.users.get(user) {
            Some(secret) => {
                let verified = secret.verify(&password);
                if !verified {
                    debug!(user, "Basic auth failed: incorrect password");
                }
                verified
            }
            None => {
                if let Some(ref decoy) = self.decoy {
                    let _ = decoy.verify(&password);
                }
                debug!(user, "Basic auth failed: user not found");
                false
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::io::Write as _;
    use std::path::PathBuf;

    use argon2::PasswordHasher as _;
    use argon2::password_hash::SaltString;

    use super::*;

    const ALICE_APR1: &str = "alice:$apr1$Jr5S8Bhm$UYsNM4UIAk3veeslKR2O41";
    const ALICE_MD5: &str = "alice:$1$saltsalt$2HM3oGhH6VPi/5dxZ798f/";
    const ALICE_SHA: &str = "alice:{SHA}AMr9EmGC6KnnwBuy8N/QBJa+ck8=";

    fn argon2_hash(password: &str) -> String {
        let salt = SaltString::encode_b64(b"fixed-test-salt!").unwrap();
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .unwrap()
            .to_string()
    }

    #[test]
    fn test_md5_crypt_known_vectors() {
        assert_eq!(
            md5_crypt(b"secret1", b"Jr5S8Bhm", b"$apr1$"),
            "UYsNM4UIAk3veeslKR2O41"
        );
        assert_eq!(
            md5_crypt(b"secret1", b"saltsalt", b"$1$"),
            "2HM3oGhH6VPi/5dxZ798f/"
        );
        // Longer than one MD5 block of password material
        assert_eq!(
            md5_crypt(
                b"hunter two with a much longer password than sixteen bytes",
                b"abcdefgh",
                b"$apr1$"
            ),
            "W4LMAReiZv9rxF94rNvb7."
        );
    }

    #[test]
    fn test_verify_htpasswd_formats() {
        for line in [ALICE_APR1, ALICE_MD5, ALICE_SHA] {
            let store = CredentialStore::from_lines([line]).unwrap();
            assert!(store.verify("alice", "secret1"), "{line}");
            assert!(!store.verify("alice", "wrong"), "{line}");
            assert!(!store.verify("bob", "anything"), "{line}");
        }
    }

    #[test]
    fn test_verify_bcrypt() {
        let hash = bcrypt::hash("secret1", 4).unwrap();
        let store = CredentialStore::from_lines([format!("alice:{hash}")]).unwrap();

        assert!(store.verify("alice", "secret1"));
        assert!(!store.verify("alice", "wrong"));
        assert!(!store.verify("bob", "secret1"));
    }

    #[test]
    fn test_verify_bcrypt_2y_prefix() {
        let hash = bcrypt::hash_with_result("secret1", 4)
            .unwrap()
            .format_for_version(bcrypt::Version::TwoY);
        assert!(hash.starts_with("$2y$"));

        let store = CredentialStore::from_lines([format!("alice:{hash}")]).unwrap();
        assert!(store.verify("alice", "secret1"));
    }

    #[test]
    fn test_verify_argon2() {
        let line = format!("alice:{}", argon2_hash("secret1"));
        let store = CredentialStore::from_lines([line]).unwrap();

        assert!(store.verify("alice", "secret1"));
        assert!(!store.verify("alice", "wrong"));
    }

    #[test]
    fn test_round_trip_every_pair_verifies() {
        let pairs = [
            ("alice", "secret1"),
            ("bob", "correct horse"),
            ("carol", "p@ss:word"),
        ];
        let lines: Vec<String> = pairs
            .iter()
            .map(|(user, password)| format!("{user}:{}", bcrypt::hash(password, 4).unwrap()))
            .collect();

        let store = CredentialStore::from_lines(&lines).unwrap();
        assert_eq!(store.len(), pairs.len());
        for (user, password) in pairs {
            assert!(store.verify(user, password), "{user}");
        }
    }

    #[test]
    fn test_malformed_lines_are_fatal() {
        for line in ["aliceonly", "alice:", ":secret", "a:b:c", ""] {
            let err = CredentialStore::from_lines([line]).unwrap_err();
            assert!(
                matches!(err, GateError::InvalidCredentialLine { line_number: 1, .. }),
                "{line:?} gave {err}"
            );
        }
    }

    #[test]
    fn test_malformed_line_reports_position() {
        let err = CredentialStore::from_lines([ALICE_SHA, "bob"]).unwrap_err();
        assert!(matches!(
            err,
            GateError::InvalidCredentialLine { line_number: 2, .. }
        ));
    }

    #[test]
    fn test_corrupt_known_formats_are_fatal() {
        for line in [
            "alice:{SHA}not-base64!",
            "alice:{SHA}c2hvcnQ=",
            "alice:$apr1$saltonly",
            "alice:$apr1$salt$short",
            "alice:$argon2id$v=19$m=19456,t=2,p=1$!!!!$!!!!",
            "alice:$2y$10$truncated",
            "alice:$2b$99$abcdefghijklmnopqrstuuKu4vDxhnRWRwtmhh6aK9jsZMX3OG6NK",
        ] {
            let err = CredentialStore::from_lines([line]).unwrap_err();
            assert!(matches!(err, GateError::InvalidSecret { .. }), "{line}");
        }
    }

    /// Average duration of a failed verification.
    fn failure_time(store: &CredentialStore, user: &str, password: &str) -> Duration {
        const RUNS: u32 = 3;
        let start = Instant::now();
        for _ in 0..RUNS {
            assert!(!store.verify(user, password));
        }
        start.elapsed() / RUNS
    }

    #[test]
    fn test_decoy_is_costliest_secret() {
        let cheap = bcrypt::hash("secret1", 4).unwrap();
        let costly = bcrypt::hash("secret1", 8).unwrap();
        let store = CredentialStore::from_lines([
            ALICE_SHA.to_string(),
            format!("bob:{cheap}"),
            format!("carol:{costly}"),
        ])
        .unwrap();

        assert_eq!(
            store.decoy,
            Some(Secret::parse("carol", &costly).unwrap())
        );
        assert!(store.failure_floor() > Duration::ZERO);
    }

    #[test]
    fn test_mixed_formats_fail_in_similar_time() {
        let bcrypt_line = format!("carol:{}", bcrypt::hash("secret1", 8).unwrap());
        let store = CredentialStore::from_lines([ALICE_SHA.to_string(), bcrypt_line]).unwrap();
        let floor = store.failure_floor();

        let wrong_password = failure_time(&store, "alice", "wrong");
        let unknown_user = failure_time(&store, "mallory", "wrong");

        assert!(wrong_password >= floor, "{wrong_password:?} < {floor:?}");
        assert!(unknown_user >= floor, "{unknown_user:?} < {floor:?}");
        let (fast, slow) = if wrong_password < unknown_user {
            (wrong_password, unknown_user)
        } else {
            (unknown_user, wrong_password)
        };
        assert!(fast * 2 >= slow, "{wrong_password:?} vs {unknown_user:?}");
    }

    #[test]
    fn test_success_is_not_padded() {
        let bcrypt_line = format!("carol:{}", bcrypt::hash("secret1", 8).unwrap());
        let store = CredentialStore::from_lines([ALICE_SHA.to_string(), bcrypt_line]).unwrap();

        let start = Instant::now();
        assert!(store.verify("alice", "secret1"));
        assert!(start.elapsed() < store.failure_floor());
    }

    #[test]
    fn test_unknown_format_never_verifies() {
        let store = CredentialStore::from_lines(["alice:plaintext"]).unwrap();
        assert!(store.contains_user("alice"));
        assert!(!store.verify("alice", "plaintext"));
    }

    #[test]
    fn test_later_lines_override() {
        let store =
            CredentialStore::from_lines(["alice:{SHA}W6ph5Mm5Pz8GgiULbPgzG37mj9g=", ALICE_SHA])
                .unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.verify("alice", "secret1"));
        assert!(!store.verify("alice", "password"));
    }

    #[test]
    fn test_empty_store_rejects_everyone() {
        let store = CredentialStore::from_lines(Vec::<String>::new()).unwrap();
        assert!(store.is_empty());
        assert!(!store.verify("alice", "secret1"));
        assert!(!store.verify("", ""));
    }

    #[test]
    fn test_secret_debug_is_redacted() {
        let (_, secret) = parse_user_line(1, ALICE_SHA).unwrap();
        assert_eq!(format!("{secret:?}"), "Secret(sha1)");
    }

    #[tokio::test]
    async fn test_load_users_file_then_inline() {
        let path = std::env::temp_dir().join(format!("auth_gate_users_{}", std::process::id()));
        {
            let mut file = std::fs::File::create(&path).unwrap();
            writeln!(file, "# gate users").unwrap();
            writeln!(file, "{ALICE_APR1}\r").unwrap();
            writeln!(file).unwrap();
            writeln!(file, "bob:{{SHA}}W6ph5Mm5Pz8GgiULbPgzG37mj9g=").unwrap();
        }

        let config = BasicAuthConfig {
            users: vec!["carol:{SHA}W6ph5Mm5Pz8GgiULbPgzG37mj9g=".to_string()],
            users_file: Some(path.clone()),
            realm: String::new(),
        };
        let lines = load_users(&config).await.unwrap();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], ALICE_APR1);
        assert!(lines[2].starts_with("carol:"));

        let store = CredentialStore::from_config(&config).await.unwrap();
        assert!(store.verify("alice", "secret1"));
        assert!(store.verify("bob", "password"));
        assert!(store.verify("carol", "password"));

        std::fs::remove_file(&path).unwrap();
    }

    #[tokio::test]
    async fn test_missing_users_file_is_fatal() {
        let config = BasicAuthConfig {
            users_file: Some(PathBuf::from("/nonexistent/auth_gate/users")),
            ..BasicAuthConfig::default()
        };
        let err = CredentialStore::from_config(&config).await.unwrap_err();
        assert!(matches!(err, GateError::UsersFile { .. }));
    }
}
