use anyhow::{Context, Result};
use cliopts::{Format, OptionFormat, ValueType};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_FORMAT_NAME: &str = "cliopts.json";

/// Load an option format from a JSON file.
pub fn load_format(path: &Path) -> Result<Format> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read format: {}", path.display()))?;
    let format: Format = serde_json::from_str(&contents)
        .with_context(|| format!("failed to parse format JSON: {}", path.display()))?;
    tracing::debug!(path = %path.display(), options = format.len(), "loaded format");
    Ok(format)
}

/// A small format showing each kind of option.
pub fn sample_format() -> Format {
    Format::new()
        .option(
            "verbose",
            OptionFormat::new()
                .short('v')
                .flag()
                .description("Print more output"),
        )
        .option(
            "output",
            OptionFormat::new()
                .short('o')
                .defaults("-")
                .description_val("FILE")
                .description("Output file\n(`-` for stdout)"),
        )
        .option(
            "jobs",
            OptionFormat::new()
                .short('j')
                .value_type(ValueType::Id)
                .defaults(1i64)
                .description_val("N")
                .description("Number of parallel jobs"),
        )
        .option(
            "include",
            OptionFormat::new()
                .short('I')
                .many()
                .defaults(Vec::<String>::new())
                .description_val("DIR")
                .description("Add a search directory (repeatable)"),
        )
}

/// Write [`sample_format`] to `dir/cliopts.json`.
///
/// An existing file is kept unless `overwrite` is set.
pub fn write_sample_format(dir: &Path, overwrite: bool) -> Result<PathBuf> {
    let dest = dir.join(DEFAULT_FORMAT_NAME);
    if dest.exists() && !overwrite {
        return Ok(dest);
    }

    let bytes =
        serde_json::to_vec_pretty(&sample_format()).context("failed to serialize format")?;
    let mut out = String::from_utf8(bytes).context("format is not valid UTF-8")?;
    out.push('\n');

    let tmp = dest.with_extension("tmp");
    fs::write(&tmp, out.as_bytes())
        .with_context(|| format!("failed to write {}", tmp.display()))?;
    if overwrite && dest.exists() {
        fs::remove_file(&dest).with_context(|| format!("failed to remove {}", dest.display()))?;
    }
    fs::rename(&tmp, &dest)
        .with_context(|| format!("failed to move {} into place", dest.display()))?;
    Ok(dest)
}
