//! lsblk-backed volume lister.
//!
//! Runs `lsblk -o mountpoint,hotplug -J` and flattens the JSON tree.
//! Partitions appear under their disk's `children`, so children are
//! listed right after their parent.

use super::{BlockDevice, VolumeLister};
use crate::config::LsblkConfig;
use crate::error::DetectError;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::process::{Command, Stdio};
use tracing::debug;

/// Top-level lsblk JSON document.
#[derive(Debug, Deserialize)]
struct LsblkOutput {
    #[serde(default)]
    blockdevices: Option<Vec<LsblkDevice>>,
}

/// One node of the lsblk device tree.
#[derive(Debug, Deserialize)]
struct LsblkDevice {
    #[serde(default)]
    mountpoint: Option<String>,
    #[serde(default, deserialize_with = "deserialize_hotplug")]
    hotplug: bool,
    #[serde(default)]
    children: Option<Vec<LsblkDevice>>,
}

/// lsblk >= 2.33 prints `true`/`false`, older releases print `"1"`/`"0"`.
/// Deliberately more lenient than a strict `== true` check so both forms count.
fn deserialize_hotplug<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_u64() == Some(1),
        Value::String(s) => s == "1" || s.eq_ignore_ascii_case("true"),
        _ => false,
    })
}

fn flatten_into(devices: Vec<LsblkDevice>, out: &mut Vec<BlockDevice>) {
    for device in devices {
        out.push(BlockDevice {
            mountpoint: device.mountpoint,
            hotplug: device.hotplug,
        });
        if let Some(children) = device.children {
            flatten_into(children, out);
        }
    }
}

/// Parse `lsblk -J` output into a flat device list.
///
/// A missing or null `blockdevices` key yields an empty list.
pub fn parse_lsblk_output(json: &str) -> Result<Vec<BlockDevice>, DetectError> {
    let output: LsblkOutput = serde_json::from_str(json)?;

    let mut devices = Vec::new();
    flatten_into(output.blockdevices.unwrap_or_default(), &mut devices);
    Ok(devices)
}

/// Lists block devices by running lsblk.
pub struct LsblkLister {
    program: String,
    args: Vec<String>,
}

impl LsblkLister {
    /// Create lister with the default lsblk invocation.
    pub fn new() -> Self {
        Self::from_config(&LsblkConfig::default())
    }

    /// Create lister from the `[lsblk]` config section.
    pub fn from_config(config: &LsblkConfig) -> Self {
        Self::with_command(&config.program, config.args.as_slice())
    }

    /// Create lister running an arbitrary command that prints lsblk-style JSON.
    pub fn with_command<S: AsRef<str>>(program: &str, args: &[S]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.as_ref().to_string()).collect(),
        }
    }

    /// Run the command and return its stdout.
    fn run(&self) -> Result<String, DetectError> {
        debug!("[Detect] Running {} {:?}", self.program, self.args);

        let output = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .map_err(|source| DetectError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(DetectError::CommandFailed {
                program: self.program.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

impl Default for LsblkLister {
    fn default() -> Self {
        Self::new()
    }
}

impl VolumeLister for LsblkLister {
    fn name(&self) -> &str {
        &self.program
    }

    fn list_devices(&self) -> Result<Vec<BlockDevice>, DetectError> {
        let stdout = self.run()?;
        parse_lsblk_output(&stdout)
    }
}
