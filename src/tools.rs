// External tool discovery (yt-dlp, ffmpeg)

use std::process::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolType {
    YtDlp,
    Ffmpeg,
}

impl ToolType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolType::YtDlp => "yt-dlp",
            ToolType::Ffmpeg => "ffmpeg",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ToolInfo {
    pub tool_type: ToolType,
    pub version: Option<String>,
    pub path: Option<String>,
    pub is_available: bool,
}

pub struct ToolManager;

impl ToolManager {
    pub fn new() -> Self {
        Self
    }

    pub fn get_tool_info(&self, tool_type: ToolType) -> ToolInfo {
        let (path, version) = self.detect_tool(tool_type);

        ToolInfo {
            tool_type,
            version,
            is_available: path.is_some(),
            path,
        }
    }

    /// Resolved binary path, or the bare name as a PATH-relative fallback
    pub fn binary_path(&self, tool_type: ToolType) -> String {
        self.get_tool_info(tool_type)
            .path
            .unwrap_or_else(|| tool_type.as_str().to_string())
    }

    fn detect_tool(&self, tool_type: ToolType) -> (Option<String>, Option<String>) {
        let binary_name = tool_type.as_str();

        // 1. Common install locations first
        let common_paths = [
            format!("/opt/homebrew/bin/{}", binary_name),
            format!("/usr/local/bin/{}", binary_name),
            format!("/usr/bin/{}", binary_name),
        ];

        for path in common_paths {
            if std::path::Path::new(&path).exists() {
                let version = self.get_version(&path, tool_type);
                return (Some(path), version);
            }
        }

        // 2. PATH lookup
        if let Ok(output) = Command::new("which").arg(binary_name).output() {
            if output.status.success() {
                let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !path.is_empty() {
                    let version = self.get_version(&path, tool_type);
                    return (Some(path), version);
                }
            }
        }

        (None, None)
    }

    fn get_version(&self, path: &str, tool_type: ToolType) -> Option<String> {
        let arg = match tool_type {
            ToolType::YtDlp => "--version",
            ToolType::Ffmpeg => "-version", // ffmpeg uses a single dash
        };

        match Command::new(path).arg(arg).output() {
            Ok(output) if output.status.success() => {
                let out = String::from_utf8_lossy(&output.stdout);
                out.lines().next().map(|l| l.trim().to_string())
            }
            _ => None,
        }
    }
}

impl Default for ToolManager {
    fn default() -> Self {
        Self::new()
    }
}
