use crate::config::ImportOptionsOverrides;
use anyhow::{anyhow, bail, Context, Result};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CliArgs {
    pub overrides: CliOverrides,
    pub options_path: Option<PathBuf>,
    pub out_path: Option<PathBuf>,
    pub inputs: Vec<PathBuf>,
    pub show_help: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CliOverrides {
    frame_offset: Option<i32>,
    delta_location: Option<[i32; 3]>,
    camera: Option<bool>,
    entities: Option<bool>,
    morphs: Option<bool>,
    euler_filter: Option<bool>,
    ignore_errors: Option<bool>,
    min_keyframes: Option<usize>,
}

impl CliArgs {
    pub fn parse_from_env() -> Result<Self> {
        Self::parse(env::args())
    }

    pub fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut parsed = CliArgs::default();
        let mut iter = args.into_iter();
        let _ = iter.next(); // skip program name if present
        while let Some(raw) = iter.next() {
            let arg = raw.as_ref();
            if arg == "--help" || arg == "-h" {
                parsed.show_help = true;
                continue;
            }
            let Some(key) = arg.strip_prefix("--") else {
                parsed.inputs.push(PathBuf::from(arg));
                continue;
            };
            let value =
                iter.next().ok_or_else(|| anyhow!("Expected a value after '{arg}'"))?.as_ref().to_string();
            let overrides = &mut parsed.overrides;
            match key {
                "frame-offset" => {
                    overrides.frame_offset =
                        Some(value.parse::<i32>().with_context(|| format!("Invalid frame offset '{value}'"))?);
                }
                "delta-location" => overrides.delta_location = Some(parse_triple(&value)?),
                "camera" => overrides.camera = Some(parse_bool_flag("camera", &value)?),
                "entities" => overrides.entities = Some(parse_bool_flag("entities", &value)?),
                "morphs" => overrides.morphs = Some(parse_bool_flag("morphs", &value)?),
                "euler-filter" => overrides.euler_filter = Some(parse_bool_flag("euler-filter", &value)?),
                "ignore-errors" => overrides.ignore_errors = Some(parse_bool_flag("ignore-errors", &value)?),
                "min-keyframes" => {
                    overrides.min_keyframes = Some(
                        value.parse::<usize>().with_context(|| format!("Invalid min keyframes '{value}'"))?,
                    );
                }
                "options" => parsed.options_path = Some(PathBuf::from(value)),
                "out" => parsed.out_path = Some(PathBuf::from(value)),
                _ => bail!(
                    "Unknown flag '{arg}'. Supported flags: --frame-offset, --delta-location, --camera, \
                     --entities, --morphs, --euler-filter, --ignore-errors, --min-keyframes, --options, --out."
                ),
            }
        }
        Ok(parsed)
    }
}

impl CliOverrides {
    pub fn into_options_overrides(self) -> ImportOptionsOverrides {
        ImportOptionsOverrides {
            frame_offset: self.frame_offset,
            import_camera: self.camera,
            import_entities: self.entities,
            import_morphs: self.morphs,
            euler_filter: self.euler_filter,
            delta_location: self.delta_location,
            ignore_errors: self.ignore_errors,
            min_keyframes: self.min_keyframes,
        }
    }
}

fn parse_triple(value: &str) -> Result<[i32; 3]> {
    let parts: Vec<&str> = value.split(',').map(str::trim).collect();
    let &[x, y, z] = parts.as_slice() else {
        bail!("Invalid delta location '{value}'. Use X,Y,Z.");
    };
    let parse = |part: &str| part.parse::<i32>().with_context(|| format!("Invalid delta location '{value}'"));
    Ok([parse(x)?, parse(y)?, parse(z)?])
}

fn parse_bool_flag(flag: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        other => bail!("Invalid {flag} value '{other}'. Use on/off or true/false."),
    }
}
