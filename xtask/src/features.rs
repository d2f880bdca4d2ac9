use anyhow::{Context, Result};

/// Feature sets that must build without the crate defaults. The empty set
/// checks the defaults themselves.
const MATRIX: &[(&str, &str)] = &[
    ("civicdesk-infra", ""),
    ("civicdesk-infra", "keychain"),
    ("civicdesk-common", "foundation"),
    ("civicdesk-common", "observability"),
    ("civicdesk-common", "runtime"),
    ("civicdesk-common", "platform"),
];

pub fn check_matrix() -> Result<()> {
    for (package, features) in MATRIX {
        let mut args = vec!["check", "-p", package];
        if !features.is_empty() {
            args.extend(["--no-default-features", "--features", features]);
        }
        println!("==> {}", args.join(" "));
        crate::cargo(&args).with_context(|| format!("{package} [{features}] does not build"))?;
    }
    println!("{} feature sets build", MATRIX.len());
    Ok(())
}
