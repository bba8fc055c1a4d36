use quartui::config::{rgb_to_256_color, rgb_to_basic_ansi, AppConfig, ColorParser, ConfigManager, Theme};
use ratatui::style::Color;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn setup_test_config_dir() -> (TempDir, ConfigManager) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config_manager = ConfigManager::with_dir(temp_dir.path().to_path_buf());
    (temp_dir, config_manager)
}

fn write_user_config(manager: &ConfigManager, content: &str) {
    manager.ensure_config_dir().unwrap();
    fs::write(manager.config_path("config.toml"), content).unwrap();
}

#[test]
fn test_default_config() {
    let config = AppConfig::default();

    assert_eq!(config.version, "0.1");
    assert_eq!(config.chart.default_buckets, 20);
    assert_eq!(config.chart.max_buckets, 200);
    assert_eq!(config.chart.tooltip_width, 40);
    assert_eq!(config.chart.string_samples, 100);
    assert_eq!(config.performance.event_poll_interval_ms, 25);
    assert_eq!(config.performance.shard_rows, 50_000);
    assert_eq!(config.performance.table_page_rows, 100);
    assert_eq!(config.export.directory(), PathBuf::from("."));
    assert_eq!(config.logging.level, "info");
    assert_eq!(config.logging.file, "quartui.log");
    assert!(!config.debug.enabled);
    assert!(config.validate().is_ok());
}

#[test]
fn test_default_template_parses_to_defaults() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    let template = config_manager.generate_default_config();

    for section in ["[chart]", "[performance]", "[export]", "[logging]", "[theme.colors]", "[debug]"] {
        assert!(template.contains(section), "missing {}", section);
    }
    let parsed: AppConfig = toml::from_str(&template).expect("template should parse");
    assert_eq!(parsed, AppConfig::default());
}

#[test]
fn test_write_default_config_respects_force() {
    let (_temp_dir, config_manager) = setup_test_config_dir();

    let path = config_manager.write_default_config(false).unwrap();
    assert!(path.exists());
    assert!(fs::read_to_string(&path).unwrap().contains("version = \"0.1\""));

    let err = config_manager.write_default_config(false).unwrap_err();
    assert!(err.to_string().contains("already exists"));

    let again = config_manager.write_default_config(true).unwrap();
    assert_eq!(path, again);
}

#[test]
fn test_missing_file_loads_defaults() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    let config = AppConfig::load_from(&config_manager).unwrap();
    assert_eq!(config, AppConfig::default());
}

#[test]
fn test_partial_file_overrides_only_given_values() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    write_user_config(
        &config_manager,
        r##"
[chart]
default_buckets = 12

[export]
directory = "/tmp/quartui-exports"

[theme.colors]
chart_box = "#00ff00"
"##,
    );

    let config = AppConfig::load_from(&config_manager).unwrap();
    assert_eq!(config.chart.default_buckets, 12);
    assert_eq!(config.chart.max_buckets, 200);
    assert_eq!(config.export.directory(), PathBuf::from("/tmp/quartui-exports"));
    assert_eq!(config.theme.colors.chart_box, "#00ff00");
    assert_eq!(config.theme.colors.chart_median, "yellow");
    assert_eq!(config.performance.table_page_rows, 100);
}

#[test]
fn test_unparsable_file_is_an_error() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    write_user_config(&config_manager, "[chart\ndefault_buckets = ");
    let err = AppConfig::load_from(&config_manager).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config file"));
}

#[test]
fn test_invalid_values_fail_validation() {
    let (_temp_dir, config_manager) = setup_test_config_dir();
    write_user_config(&config_manager, "[chart]\ndefault_buckets = 300\n");
    let err = AppConfig::load_from(&config_manager).unwrap_err();
    assert!(err.to_string().contains("max_buckets"));

    let mut config = AppConfig::default();
    config.version = "2.0".to_string();
    assert!(config.validate().unwrap_err().to_string().contains("Unsupported config version"));

    let mut config = AppConfig::default();
    config.performance.shard_rows = 0;
    assert!(config.validate().is_err());

    let mut config = AppConfig::default();
    config.chart.tooltip_width = 4;
    assert!(config.validate().is_err());

    let mut config = AppConfig::default();
    config.theme.colors.selection = "not_a_color".to_string();
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("selection"));
}

#[test]
fn test_merge_keeps_base_for_default_values() {
    let mut base = AppConfig::default();
    base.chart.max_buckets = 50;
    base.logging.level = "debug".to_string();

    let mut other = AppConfig::default();
    other.chart.string_samples = 10;
    other.debug.enabled = true;

    base.merge(other);
    assert_eq!(base.chart.max_buckets, 50);
    assert_eq!(base.chart.string_samples, 10);
    assert_eq!(base.logging.level, "debug");
    assert!(base.debug.enabled);
}

#[test]
fn test_color_formats() {
    std::env::remove_var("NO_COLOR");
    let parser = ColorParser::new();

    assert_eq!(parser.parse("red").unwrap(), Color::Red);
    assert_eq!(parser.parse(" Bright_Blue ").unwrap(), Color::Indexed(12));
    assert_eq!(parser.parse("dark gray").unwrap(), Color::Indexed(8));
    assert_eq!(parser.parse("indexed(236)").unwrap(), Color::Indexed(236));
    assert_eq!(parser.parse("default").unwrap(), Color::Reset);
    assert!(parser.parse("#ff0000").is_ok());

    assert!(parser.parse("indexed(256)").is_err());
    assert!(parser.parse("#gg0000").is_err());
    assert!(parser
        .parse("chartreuse")
        .unwrap_err()
        .to_string()
        .contains("Unknown color name"));
}

#[test]
fn test_rgb_fallbacks() {
    assert_eq!(rgb_to_256_color(0, 0, 0), 16);
    assert_eq!(rgb_to_256_color(255, 255, 255), 231);
    assert_eq!(rgb_to_256_color(255, 0, 0), 196);
    assert_eq!(rgb_to_basic_ansi(0, 200, 200), Color::Cyan);
    assert_eq!(rgb_to_basic_ansi(20, 20, 20), Color::Black);
}

#[test]
fn test_theme_covers_chart_colors() {
    let theme = Theme::from_config(&AppConfig::default().theme).unwrap();
    for name in ["chart_box", "chart_median", "chart_whisker", "selection", "tooltip_border"] {
        assert!(theme.get_optional(name).is_some(), "missing {}", name);
    }
    assert_eq!(theme.get("no_such_color"), Color::Reset);
}
