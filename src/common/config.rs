use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::layout_engine::{ArrangementKind, GridArrangement, Orientation, RatioArrangement};

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub settings: LayoutSettings,
}

#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct LayoutSettings {
    /// Orientation of the root panel of newly registered desktops
    #[serde(default)]
    pub default_orientation: Orientation,
    /// Gap configuration for window spacing
    #[serde(default)]
    pub gaps: GapSettings,
    /// One-shot arrangement used by `Workspace::arrange_flat`
    #[serde(default)]
    pub arrangement: ArrangementKind,
}

/// Gap configuration for window spacing
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct GapSettings {
    /// Outer gaps (space between windows and the work area edges)
    #[serde(default)]
    pub outer: OuterGaps,
    /// Inner gaps (space between windows)
    #[serde(default)]
    pub inner: InnerGaps,
}

/// Outer gap configuration (space between windows and the work area edges)
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct OuterGaps {
    #[serde(default)]
    pub top: f64,
    #[serde(default)]
    pub left: f64,
    #[serde(default)]
    pub bottom: f64,
    #[serde(default)]
    pub right: f64,
}

/// Inner gap configuration (space between windows)
#[derive(Serialize, Deserialize, Debug, PartialEq, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct InnerGaps {
    /// Gap between windows laid out side by side
    #[serde(default)]
    pub horizontal: f64,
    /// Gap between windows laid out on top of each other
    #[serde(default)]
    pub vertical: f64,
}

impl LayoutSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        issues.extend(self.gaps.validate());

        match &self.arrangement {
            ArrangementKind::Grid(grid) => {
                if grid.spacing < 0.0 {
                    issues.push(format!(
                        "arrangement.spacing must be non-negative, got {}",
                        grid.spacing
                    ));
                }
            }
            ArrangementKind::Ratio(ratio) => {
                if !(ratio.ratio() > 0.0 && ratio.ratio() < 1.0) {
                    issues.push(format!(
                        "arrangement.ratio must be strictly between 0 and 1, got {}",
                        ratio.ratio()
                    ));
                }
                if ratio.spacing() < 0.0 {
                    issues.push(format!(
                        "arrangement.spacing must be non-negative, got {}",
                        ratio.spacing()
                    ));
                }
            }
        }

        issues
    }

    pub fn auto_fix_values(&mut self) -> usize {
        let mut fixes = self.gaps.auto_fix_values();

        match &mut self.arrangement {
            ArrangementKind::Grid(grid) => {
                if grid.spacing < 0.0 {
                    *grid = GridArrangement::default();
                    fixes += 1;
                }
            }
            ArrangementKind::Ratio(ratio) => {
                let defaults = RatioArrangement::default();
                let mut value = ratio.ratio();
                let mut spacing = ratio.spacing();
                if !(value > 0.0 && value < 1.0) {
                    value = defaults.ratio();
                    fixes += 1;
                }
                if spacing < 0.0 {
                    spacing = defaults.spacing();
                    fixes += 1;
                }
                *ratio = RatioArrangement::new(value, spacing).unwrap_or(defaults);
            }
        }

        fixes
    }
}

impl GapSettings {
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        issues.extend(self.outer.validate());

        issues.extend(self.inner.validate());

        issues
    }

    pub fn auto_fix_values(&mut self) -> usize {
        self.outer.auto_fix_values() + self.inner.auto_fix_values()
    }

    /// Gap between neighbours laid out along `orientation`.
    pub fn inner_gap(&self, orientation: Orientation) -> f64 {
        match orientation {
            Orientation::Horizontal => self.inner.horizontal,
            Orientation::Vertical => self.inner.vertical,
        }
    }
}

impl OuterGaps {
    pub fn uniform(gap: f64) -> Self {
        Self {
            top: gap,
            left: gap,
            bottom: gap,
            right: gap,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.top == 0.0 && self.left == 0.0 && self.bottom == 0.0 && self.right == 0.0
    }

    /// Validates outer gap configuration values and returns a list of issues found.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        for (name, value) in [
            ("top", self.top),
            ("left", self.left),
            ("bottom", self.bottom),
            ("right", self.right),
        ] {
            if value < 0.0 {
                issues.push(format!("outer.{name} gap must be non-negative, got {value}"));
            }
        }

        issues
    }

    /// Attempts to fix outer gap configuration values automatically.
    /// Returns the number of fixes applied.
    pub fn auto_fix_values(&mut self) -> usize {
        let mut fixes = 0;

        for value in [&mut self.top, &mut self.left, &mut self.bottom, &mut self.right] {
            if *value < 0.0 {
                *value = 0.0;
                fixes += 1;
            }
        }

        fixes
    }
}

impl InnerGaps {
    pub fn uniform(gap: f64) -> Self {
        Self {
            horizontal: gap,
            vertical: gap,
        }
    }

    /// Validates inner gap configuration values and returns a list of issues found.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.horizontal < 0.0 {
            issues.push(format!(
                "inner.horizontal gap must be non-negative, got {}",
                self.horizontal
            ));
        }

        if self.vertical < 0.0 {
            issues.push(format!(
                "inner.vertical gap must be non-negative, got {}",
                self.vertical
            ));
        }

        issues
    }

    pub fn auto_fix_values(&mut self) -> usize {
        let mut fixes = 0;

        if self.horizontal < 0.0 {
            self.horizontal = 0.0;
            fixes += 1;
        }

        if self.vertical < 0.0 {
            self.vertical = 0.0;
            fixes += 1;
        }

        fixes
    }
}

impl Config {
    pub fn read(path: &Path) -> anyhow::Result<Config> {
        let buf = std::fs::read_to_string(path)?;
        Self::parse(&buf)
    }

    pub fn parse(buf: &str) -> anyhow::Result<Config> { Ok(toml::from_str(buf)?) }

    /// The settings shipped in `tilecore.default.toml`.
    pub fn bundled() -> anyhow::Result<Config> {
        Self::parse(include_str!("../../tilecore.default.toml"))
    }

    /// Validates the entire configuration and returns a list of issues found.
    pub fn validate(&self) -> Vec<String> { self.settings.validate() }

    /// Attempts to fix configuration values automatically.
    /// Returns the number of fixes applied.
    pub fn auto_fix_values(&mut self) -> usize { self.settings.auto_fix_values() }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn bundled_config_parses() {
        let config = Config::bundled().unwrap();
        assert!(config.validate().is_empty());
        assert_eq!(config.settings.default_orientation, Orientation::Horizontal);
    }

    #[test]
    fn empty_config_is_default() {
        assert_eq!(Config::parse("").unwrap(), Config::default());
    }

    #[test]
    fn test_layout_settings_parse() {
        let config = Config::parse(
            r#"
            [settings]
            default_orientation = "vertical"

            [settings.gaps.outer]
            top = 8
            left = 4.5

            [settings.gaps.inner]
            horizontal = 6

            [settings.arrangement]
            kind = "ratio"
            ratio = 0.6
            spacing = 2
            "#,
        )
        .unwrap();
        let settings = &config.settings;
        assert_eq!(settings.default_orientation, Orientation::Vertical);
        assert_eq!(settings.gaps.outer.top, 8.0);
        assert_eq!(settings.gaps.outer.left, 4.5);
        assert_eq!(settings.gaps.outer.right, 0.0);
        assert_eq!(settings.gaps.inner_gap(Orientation::Horizontal), 6.0);
        assert_eq!(settings.gaps.inner_gap(Orientation::Vertical), 0.0);
        assert_eq!(
            settings.arrangement,
            ArrangementKind::Ratio(RatioArrangement::new(0.6, 2.0).unwrap())
        );
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(Config::parse("[settings]\nanimate = true").is_err());
        assert!(Config::parse("[settings.gaps.inner]\ndiagonal = 1").is_err());
    }

    #[test]
    fn test_config_validation() {
        let mut config = Config::default();
        assert!(config.validate().is_empty());

        config.settings.gaps.outer.left = -3.0;
        config.settings.gaps.inner.vertical = -1.0;
        let issues = config.validate();
        assert_eq!(issues.len(), 2);
        assert!(issues[0].contains("outer.left gap must be non-negative"));
        assert!(issues[1].contains("inner.vertical gap must be non-negative"));

        let fixes = config.auto_fix_values();
        assert_eq!(fixes, 2);
        assert_eq!(config.settings.gaps.outer.left, 0.0);
        assert_eq!(config.settings.gaps.inner.vertical, 0.0);

        let mut config = Config::parse(
            "[settings.arrangement]\nkind = \"ratio\"\nratio = 1.5\nspacing = -2",
        )
        .unwrap();
        assert_eq!(config.validate().len(), 2);
        assert_eq!(config.auto_fix_values(), 2);
        assert_eq!(
            config.settings.arrangement,
            ArrangementKind::Ratio(RatioArrangement::default())
        );
        assert!(config.validate().is_empty());
    }

    #[test]
    fn reads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[settings.gaps.outer]\nbottom = 12").unwrap();
        let config = Config::read(file.path()).unwrap();
        assert_eq!(config.settings.gaps.outer.bottom, 12.0);

        assert!(Config::read(&file.path().with_extension("missing")).is_err());
    }
}
