// Path: fridactl-core/src/install/stage.rs
use std::path::Path;

use fridactl_common::error::Result;
use tracing::{debug, instrument};

use crate::process::shell::{run_checked, shell_quote, ElevatedShell};

pub const STAGED_MODE: &str = "755";

/// Copies `src` into the privileged location `dst` and makes it world
/// executable: one elevated `cp`, then one elevated `chmod`, each awaited.
///
/// Whether `dst` already exists is the caller's call, made once up front.
#[instrument(skip(shell), fields(src = %src.display(), dst = %dst.display()))]
pub async fn stage<S: ElevatedShell>(shell: &S, src: &Path, dst: &Path) -> Result<()> {
    let src = shell_quote(&src.to_string_lossy());
    let dst = shell_quote(&dst.to_string_lossy());

    run_checked(shell, &format!("cp {src} {dst}")).await?;
    debug!("Copied into staging directory");
    run_checked(shell, &format!("chmod {STAGED_MODE} {dst}")).await?;
    debug!("Staged binary marked executable");
    Ok(())
}
