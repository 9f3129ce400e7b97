//! Manual decryption handoff
//!
//! The exporter never decrypts the archive itself: the private key stays with the
//! operator, who decrypts the archive out of band and extracts the manifest. The
//! pipeline pauses at this point and only continues once a [`DecryptionHandoff`]
//! confirms the manifest is in place.

use crate::error::{Error, Result};
use crate::types::DecryptionParams;
use async_trait::async_trait;
use std::io::{BufRead, Write};

/// Hands the decryption parameters to whoever decrypts the archive
///
/// Returning `Ok(false)` aborts the run with [`Error::Aborted`].
#[async_trait]
pub trait DecryptionHandoff: Send + Sync {
    /// Present `params` and wait until the decrypted manifest is ready
    async fn confirm_decrypted(&self, params: &DecryptionParams) -> Result<bool>;
}

/// Terminal handoff: prints the parameters and asks the operator to continue
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleHandoff;

#[async_trait]
impl DecryptionHandoff for ConsoleHandoff {
    async fn confirm_decrypted(&self, params: &DecryptionParams) -> Result<bool> {
        let params = params.clone();
        tokio::task::spawn_blocking(move || {
            let stdin = std::io::stdin();
            let stdout = std::io::stdout();
            prompt_continue(&params, &mut stdin.lock(), &mut stdout.lock())
        })
        .await
        .map_err(|e| Error::Io(std::io::Error::other(e)))?
    }
}

/// Print `params` to `output` and read a yes/no answer from `input`
fn prompt_continue(
    params: &DecryptionParams,
    input: &mut impl BufRead,
    output: &mut impl Write,
) -> Result<bool> {
    writeln!(output, "Encrypted archive: {}", params.archive_path.display())?;
    writeln!(output, "ENCRYPTED_AES_KEY: {}", params.encrypted_aes_key)?;
    writeln!(output, "AES_IV: {}", params.aes_iv)?;
    write!(output, "Please manually decode and continue. Continue? [y/N]: ")?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
