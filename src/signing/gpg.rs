// src/signing/gpg.rs

//! Signing through the `gpg` command line tool

use super::{SignMode, Signer, SigningConfig, artifact_path};
use crate::error::{Error, Result};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use tracing::{debug, info, warn};
use wait_timeout::ChildExt;

/// Runs `gpg -a [--default-key=KEY] [options] -b|--clearsign <file>`
#[derive(Debug, Clone)]
pub struct GpgSigner {
    config: SigningConfig,
}

impl GpgSigner {
    pub fn new(config: SigningConfig) -> Self {
        Self { config }
    }

    /// Arguments passed to the signing binary
    fn args(&self, path: &Path, mode: SignMode) -> Vec<String> {
        let mut args = vec!["-a".to_string()];
        if !self.config.key.is_empty() {
            args.push(format!("--default-key={}", self.config.key));
        }
        args.extend(self.config.gpg_options.iter().cloned());
        args.push(
            match mode {
                SignMode::Detached => "-b",
                SignMode::Clearsign => "--clearsign",
            }
            .to_string(),
        );
        args.push(path.to_string_lossy().into_owned());
        args
    }
}

impl Signer for GpgSigner {
    fn sign(&self, path: &Path, mode: SignMode) -> Result<PathBuf> {
        let binary = &self.config.gpg_binary;
        let args = self.args(path, mode);
        debug!("Executing: {} {:?}", binary, args);

        let mut child = Command::new(binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| Error::SigningError(format!("Failed to spawn '{}': {}", binary, e)))?;

        // Drained while waiting so a chatty gpg cannot fill the pipe
        let mut stderr_pipe = child.stderr.take();
        let stderr_reader = thread::spawn(move || {
            let mut buf = Vec::new();
            if let Some(pipe) = stderr_pipe.as_mut() {
                let _ = pipe.read_to_end(&mut buf);
            }
            buf
        });

        match child.wait_timeout(self.config.timeout)? {
            Some(status) => {
                let stderr = stderr_reader.join().unwrap_or_default();
                let stderr = String::from_utf8_lossy(&stderr);

                if !status.success() {
                    let code = status.code().unwrap_or(-1);
                    return Err(Error::SigningError(format!(
                        "'{}' failed with exit code {}: {}",
                        binary,
                        code,
                        stderr.trim()
                    )));
                }
                for line in stderr.lines() {
                    debug!("[{}] {}", binary, line);
                }
            }
            None => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(Error::SigningError(format!(
                    "'{}' timed out after {} seconds",
                    binary,
                    self.config.timeout.as_secs()
                )));
            }
        }

        let artifact = artifact_path(path);
        if !artifact.exists() {
            warn!("{} exited successfully but wrote no signature", binary);
            return Err(Error::SigningError(format!(
                "signature file {} was not created",
                artifact.display()
            )));
        }

        info!(
            "Signed {} ({})",
            path.display(),
            match mode {
                SignMode::Detached => "detached",
                SignMode::Clearsign => "clearsign",
            }
        );
        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_args_detached_with_key() {
        let signer = GpgSigner::new(SigningConfig {
            key: "ABCD1234".to_string(),
            gpg_options: vec!["--batch".to_string(), "--yes".to_string()],
            ..Default::default()
        });
        assert_eq!(
            signer.args(Path::new("/tmp/release"), SignMode::Detached),
            vec!["-a", "--default-key=ABCD1234", "--batch", "--yes", "-b", "/tmp/release"]
        );
    }

    #[test]
    fn test_args_clearsign_default_key() {
        let signer = GpgSigner::new(SigningConfig::default());
        assert_eq!(
            signer.args(Path::new("/tmp/release"), SignMode::Clearsign),
            vec!["-a", "--clearsign", "/tmp/release"]
        );
    }

    #[test]
    fn test_missing_binary() {
        let signer = GpgSigner::new(SigningConfig {
            gpg_binary: "/nonexistent/gpg-binary".to_string(),
            ..Default::default()
        });
        let err = signer
            .sign(Path::new("/tmp/release"), SignMode::Detached)
            .unwrap_err();
        assert!(matches!(err, Error::SigningError(_)));
    }

    #[cfg(unix)]
    mod scripted {
        use super::*;
        use std::fs;
        use std::os::unix::fs::PermissionsExt;
        use tempfile::TempDir;

        fn script(dir: &TempDir, body: &str) -> String {
            let path = dir.path().join("fake-gpg");
            fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
            fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
            path.to_string_lossy().into_owned()
        }

        fn signer(binary: String) -> GpgSigner {
            GpgSigner::new(SigningConfig {
                gpg_binary: binary,
                timeout: Duration::from_secs(10),
                ..Default::default()
            })
        }

        #[test]
        fn test_sign_writes_artifact() {
            let dir = TempDir::new().unwrap();
            let binary = script(
                &dir,
                r#"for last; do :; done; echo "SIGNED" > "$last.asc""#,
            );
            let target = dir.path().join("Release");
            fs::write(&target, "Codename: stable\n").unwrap();

            let artifact = signer(binary).sign(&target, SignMode::Detached).unwrap();
            assert_eq!(artifact, dir.path().join("Release.asc"));
            assert_eq!(fs::read_to_string(artifact).unwrap(), "SIGNED\n");
        }

        #[test]
        fn test_large_stderr_does_not_stall() {
            let dir = TempDir::new().unwrap();
            let binary = script(
                &dir,
                r#"for last; do :; done
i=0
while [ $i -lt 4000 ]; do
  echo "gpg: verbose diagnostic line number $i padding padding padding" >&2
  i=$((i + 1))
done
echo "SIGNED" > "$last.asc""#,
            );
            let target = dir.path().join("Release");
            fs::write(&target, "x").unwrap();

            let signer = GpgSigner::new(SigningConfig {
                gpg_binary: binary,
                timeout: Duration::from_secs(5),
                ..Default::default()
            });
            let artifact = signer.sign(&target, SignMode::Detached).unwrap();
            assert_eq!(fs::read_to_string(artifact).unwrap(), "SIGNED\n");
        }

        #[test]
        fn test_nonzero_exit_is_signing_error() {
            let dir = TempDir::new().unwrap();
            let binary = script(&dir, "echo 'no secret key' >&2; exit 2");
            let target = dir.path().join("Release");
            fs::write(&target, "x").unwrap();

            let err = signer(binary).sign(&target, SignMode::Detached).unwrap_err();
            assert!(matches!(err, Error::SigningError(msg) if msg.contains("no secret key")));
        }

        #[test]
        fn test_missing_artifact_is_signing_error() {
            let dir = TempDir::new().unwrap();
            let binary = script(&dir, "exit 0");
            let target = dir.path().join("Release");
            fs::write(&target, "x").unwrap();

            let err = signer(binary).sign(&target, SignMode::Clearsign).unwrap_err();
            assert!(matches!(err, Error::SigningError(msg) if msg.contains("not created")));
        }
    }
}
