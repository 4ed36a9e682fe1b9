use crate::events::{Hotkey, Modifiers};
use crate::mappings::KeyNames;
use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Duration;

/// Верхняя граница шага: сто щелчков колеса в hi-res единицах
pub const MAX_STEP_SIZE: u32 = 120 * 100;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Общий выключатель движка при старте
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Имена исполняемых файлов, в которых плавная прокрутка отключена
    #[serde(default)]
    pub blacklist: Vec<String>,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub scroll: ScrollConfig,
    #[serde(default)]
    pub hotkey: HotkeyConfig,
    #[serde(default)]
    pub window: WindowConfig,
    /// Индивидуальные параметры для отдельных программ
    #[serde(default)]
    pub apps: Vec<AppOverride>,
    // Оптимизационные индексы - не сериализуются, строятся после загрузки
    #[serde(skip)]
    blacklist_lower: HashSet<String>,
    #[serde(skip)]
    apps_lower: HashMap<String, AppOverride>,
    #[serde(skip)]
    toggle_hotkey: Option<Hotkey>,
    #[serde(skip)]
    zoom_modifiers: Modifiers,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub filter: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InputConfig {
    pub mouse_device_path: String,
    pub keyboard_device_path: String,
    pub virtual_device_name: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScrollConfig {
    /// Расстояние одного щелчка в hi-res единицах (120 = один щелчок колеса)
    pub step_size: u32,
    pub animation_time_ms: u64,
    /// Интервал между щелчками, ниже которого включается ускорение
    pub acceleration_delta_ms: u64,
    pub acceleration_max: f64,
    /// Отношение длительности "хвоста" торможения к разгону
    pub tail_head_ratio: f64,
    pub easing: bool,
    pub shift_horizontal: bool,
    pub horizontal_smoothing: bool,
    pub reverse_direction: bool,
    /// Модификатор масштабирования: с ним колесо всегда пробрасывается как есть
    pub zoom_modifier: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HotkeyConfig {
    /// Комбинация переключения движка, например "ctrl+alt+s"; пустая строка отключает
    pub toggle: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WindowConfig {
    pub detection_method: String,
    pub polling_interval_ms: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct AppOverride {
    pub name: String,
    pub step_size: Option<u32>,
    pub animation_time_ms: Option<u64>,
    pub acceleration_delta_ms: Option<u64>,
    pub acceleration_max: Option<f64>,
    pub tail_head_ratio: Option<f64>,
}

/// Параметры ускорения, действующие для текущего события
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccelerationParams {
    pub threshold: Duration,
    pub max: f64,
}

/// Параметры анимации, фиксируемые в момент запуска/продления
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationParams {
    pub duration: Duration,
    pub tail_head_ratio: f64,
    pub easing: bool,
}

impl AnimationParams {
    /// Длительность с учётом растянутого хвоста: base × (1 + r/(1 + r))
    pub fn effective_duration(&self) -> Duration {
        let ratio = self.tail_head_ratio.max(0.0);
        let stretch = 1.0 + ratio / (1.0 + ratio);
        let millis = (self.duration.as_secs_f64() * 1000.0 * stretch).round() as u64;
        Duration::from_millis(millis.max(1))
    }
}

/// Итоговые параметры прокрутки для активной программы
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollParams {
    pub step_size: f64,
    pub acceleration: AccelerationParams,
    pub animation: AnimationParams,
}

fn default_enabled() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            filter: "smooth_scroll=info".to_string(),
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            mouse_device_path: "auto".to_string(),
            keyboard_device_path: "auto".to_string(),
            virtual_device_name: "Smooth-Scroll Virtual Mouse".to_string(),
        }
    }
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            step_size: 100,
            animation_time_ms: 400,
            acceleration_delta_ms: 50,
            acceleration_max: 3.0,
            tail_head_ratio: 4.0,
            easing: true,
            shift_horizontal: true,
            horizontal_smoothing: true,
            reverse_direction: false,
            zoom_modifier: "ctrl".to_string(),
        }
    }
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            toggle: "ctrl+alt+s".to_string(),
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            detection_method: "auto".to_string(),
            polling_interval_ms: 250,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut config = Self {
            enabled: true,
            blacklist: Vec::new(),
            logging: LoggingConfig::default(),
            input: InputConfig::default(),
            scroll: ScrollConfig::default(),
            hotkey: HotkeyConfig::default(),
            window: WindowConfig::default(),
            apps: Vec::new(),
            blacklist_lower: HashSet::new(),
            apps_lower: HashMap::new(),
            toggle_hotkey: None,
            zoom_modifiers: Modifiers::new(),
        };
        config.build_optimization_indexes();
        config
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let config_path = config_path.as_ref();

        let figment = Figment::new()
            .merge(Toml::file(config_path))
            .merge(Env::prefixed("SMOOTH_SCROLL_").split("__"));

        Self::from_figment(figment)
            .with_context(|| format!("Не удалось загрузить конфигурацию из {:?}", config_path))
    }

    pub fn from_toml_str(toml: &str) -> Result<Self> {
        Self::from_figment(Figment::new().merge(Toml::string(toml)))
    }

    fn from_figment(figment: Figment) -> Result<Self> {
        let mut config: Config = figment.extract()?;

        config.validate()?;
        config.build_optimization_indexes();

        Ok(config)
    }

    /// Строит оптимизационные индексы для быстрого поиска на горячем пути
    pub fn build_optimization_indexes(&mut self) {
        self.blacklist_lower = self
            .blacklist
            .iter()
            .map(|name| name.trim().to_lowercase())
            .filter(|name| !name.is_empty())
            .collect();

        self.apps_lower = self
            .apps
            .iter()
            .map(|app| (app.name.trim().to_lowercase(), app.clone()))
            .collect();

        // Ошибки разбора уже отсеяны validate()
        self.toggle_hotkey = if self.hotkey.toggle.trim().is_empty() {
            None
        } else {
            KeyNames::parse_hotkey(&self.hotkey.toggle).ok()
        };

        self.zoom_modifiers = Modifiers::from_name(&self.scroll.zoom_modifier).unwrap_or_default();
    }

    pub fn validate(&self) -> Result<()> {
        // Валидация настроек логирования
        match self.logging.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!("Неверный уровень логирования: {}", self.logging.level),
        }

        match self.logging.format.as_str() {
            "pretty" | "json" => {}
            _ => anyhow::bail!("Неверный формат логирования: {}", self.logging.format),
        }

        // Валидация параметров прокрутки
        Self::validate_scroll_values(
            "scroll",
            Some(self.scroll.step_size),
            Some(self.scroll.animation_time_ms),
            Some(self.scroll.acceleration_delta_ms),
            Some(self.scroll.acceleration_max),
            Some(self.scroll.tail_head_ratio),
        )?;

        if Modifiers::from_name(&self.scroll.zoom_modifier).is_none() {
            anyhow::bail!("Неверный модификатор масштабирования: {}", self.scroll.zoom_modifier);
        }

        if !self.hotkey.toggle.trim().is_empty() {
            KeyNames::parse_hotkey(&self.hotkey.toggle).map_err(|e| anyhow::anyhow!(e))?;
        }

        // Валидация настроек окон
        match self.window.detection_method.as_str() {
            "auto" | "kdotool" | "xdotool" | "sway" | "none" => {}
            _ => anyhow::bail!(
                "Неверный метод детекции окон: {}",
                self.window.detection_method
            ),
        }

        if self.window.polling_interval_ms < 50 {
            anyhow::bail!("polling_interval_ms должно быть минимум 50");
        }

        // Валидация индивидуальных настроек
        for (i, app) in self.apps.iter().enumerate() {
            if app.name.trim().is_empty() {
                anyhow::bail!("Пустое имя программы в apps #{}", i + 1);
            }
            Self::validate_scroll_values(
                &format!("apps #{}", i + 1),
                app.step_size,
                app.animation_time_ms,
                app.acceleration_delta_ms,
                app.acceleration_max,
                app.tail_head_ratio,
            )?;
        }

        Ok(())
    }

    fn validate_scroll_values(
        section: &str,
        step_size: Option<u32>,
        animation_time_ms: Option<u64>,
        acceleration_delta_ms: Option<u64>,
        acceleration_max: Option<f64>,
        tail_head_ratio: Option<f64>,
    ) -> Result<()> {
        if let Some(step) = step_size {
            if !(1..=MAX_STEP_SIZE).contains(&step) {
                anyhow::bail!(
                    "{}: step_size должно быть в диапазоне 1..={}",
                    section,
                    MAX_STEP_SIZE
                );
            }
        }
        if animation_time_ms == Some(0) {
            anyhow::bail!("{}: animation_time_ms должно быть больше 0", section);
        }
        if acceleration_delta_ms == Some(0) {
            anyhow::bail!("{}: acceleration_delta_ms должно быть больше 0", section);
        }
        if let Some(max) = acceleration_max {
            if !(1.0..=20.0).contains(&max) {
                anyhow::bail!("{}: acceleration_max должно быть в диапазоне 1.0..=20.0", section);
            }
        }
        if let Some(ratio) = tail_head_ratio {
            if !(0.0..=20.0).contains(&ratio) {
                anyhow::bail!("{}: tail_head_ratio должно быть в диапазоне 0.0..=20.0", section);
            }
        }
        Ok(())
    }

    /// Регистронезависимая проверка имени процесса по чёрному списку
    pub fn is_blacklisted(&self, process_name_lower: &str) -> bool {
        self.blacklist_lower.contains(process_name_lower)
    }

    pub fn has_blacklist(&self) -> bool {
        !self.blacklist_lower.is_empty()
    }

    pub fn toggle_hotkey(&self) -> Option<Hotkey> {
        self.toggle_hotkey
    }

    pub fn zoom_modifiers(&self) -> Modifiers {
        self.zoom_modifiers
    }

    /// Параметры прокрутки с учётом индивидуальных настроек программы
    pub fn scroll_params_for(&self, process_name_lower: Option<&str>) -> ScrollParams {
        let app = process_name_lower.and_then(|name| self.apps_lower.get(name));
        let scroll = &self.scroll;

        let step_size = app.and_then(|a| a.step_size).unwrap_or(scroll.step_size);
        let animation_time_ms = app
            .and_then(|a| a.animation_time_ms)
            .unwrap_or(scroll.animation_time_ms);
        let acceleration_delta_ms = app
            .and_then(|a| a.acceleration_delta_ms)
            .unwrap_or(scroll.acceleration_delta_ms);
        let acceleration_max = app
            .and_then(|a| a.acceleration_max)
            .unwrap_or(scroll.acceleration_max);
        let tail_head_ratio = app
            .and_then(|a| a.tail_head_ratio)
            .unwrap_or(scroll.tail_head_ratio);

        ScrollParams {
            step_size: f64::from(step_size),
            acceleration: AccelerationParams {
                threshold: Duration::from_millis(acceleration_delta_ms),
                max: acceleration_max,
            },
            animation: AnimationParams {
                duration: Duration::from_millis(animation_time_ms),
                tail_head_ratio,
                easing: scroll.easing,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert!(config.toggle_hotkey().is_some());
        assert_eq!(config.zoom_modifiers(), Modifiers::new().with_ctrl(true));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = Config::from_toml_str(
            r#"
            blacklist = ["Notepad.EXE", "  gimp  "]

            [scroll]
            step_size = 120
            "#,
        )
        .unwrap();

        assert_eq!(config.scroll.step_size, 120);
        assert_eq!(config.scroll.animation_time_ms, 400);
        assert!(config.is_blacklisted("notepad.exe"));
        assert!(config.is_blacklisted("gimp"));
        assert!(!config.is_blacklisted("firefox"));
    }

    #[test]
    fn test_app_overrides() {
        let config = Config::from_toml_str(
            r#"
            [[apps]]
            name = "Firefox"
            step_size = 60
            tail_head_ratio = 1.0
            "#,
        )
        .unwrap();

        let firefox = config.scroll_params_for(Some("firefox"));
        assert_eq!(firefox.step_size, 60.0);
        assert_eq!(firefox.animation.tail_head_ratio, 1.0);
        assert_eq!(firefox.animation.duration, Duration::from_millis(400));

        let other = config.scroll_params_for(Some("kate"));
        assert_eq!(other.step_size, 100.0);
        assert_eq!(config.scroll_params_for(None), other);
    }

    #[test]
    fn test_largest_step_keeps_output_in_range() {
        let config = Config::from_toml_str("[scroll]\nstep_size = 12000\nacceleration_max = 20.0").unwrap();
        let params = config.scroll_params_for(None);
        let largest = params.step_size * params.acceleration.max;
        assert!(largest * 100.0 < f64::from(i32::MAX));
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(Config::from_toml_str("[scroll]\nstep_size = 0").is_err());
        assert!(Config::from_toml_str("[scroll]\nacceleration_max = 0.5").is_err());
        assert!(Config::from_toml_str("[scroll]\nstep_size = 12001").is_err());
        assert!(Config::from_toml_str("[[apps]]\nname = \"firefox\"\nstep_size = 4000000000").is_err());
        assert!(Config::from_toml_str("[scroll]\nzoom_modifier = \"hyper\"").is_err());
        assert!(Config::from_toml_str("[hotkey]\ntoggle = \"ctrl+alt\"").is_err());
        assert!(Config::from_toml_str("[[apps]]\nname = \"\"").is_err());
    }

    #[test]
    fn test_shipped_config_is_valid() {
        let config = Config::from_toml_str(include_str!("../smooth-scroll.toml")).unwrap();
        assert!(config.is_blacklisted("steam"));
        assert_eq!(config.scroll_params_for(Some("firefox")).step_size, 120.0);
    }

    #[test]
    fn test_empty_hotkey_disables_toggle() {
        let config = Config::from_toml_str("[hotkey]\ntoggle = \"\"").unwrap();
        assert!(config.toggle_hotkey().is_none());
    }

    #[test]
    fn test_effective_duration_stretches_tail() {
        let params = AnimationParams {
            duration: Duration::from_millis(400),
            tail_head_ratio: 4.0,
            easing: true,
        };
        assert_eq!(params.effective_duration(), Duration::from_millis(720));

        let no_tail = AnimationParams { tail_head_ratio: 0.0, ..params };
        assert_eq!(no_tail.effective_duration(), Duration::from_millis(400));
    }
}
