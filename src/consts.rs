//! Form factor names, object paths and runtime defaults.

// --- Form factor names, as they appear in the GPIO definitions file ---
/// Multi-position host selector switch.
pub const HOST_SELECTOR: &str = "HOST_SELECTOR";
/// Chassis identify button.
pub const ID_BUTTON: &str = "ID_BTN";
/// Debug host selector button (momentary).
pub const DEBUG_SELECTOR_BUTTON: &str = "DEBUG_SELECTOR_BUTTON";
/// Power button, observed through inbound notifications rather than lines.
pub const POWER_BUTTON: &str = "POWER_BUTTON";

// --- Object paths published alongside each state update ---
pub const BUTTONS_ROOT_PATH: &str = "/xyz/openbmc_project/Chassis/Buttons";
pub const HOST_SELECTOR_PATH: &str = "/xyz/openbmc_project/Chassis/Buttons/HostSelector";
pub const ID_BUTTON_PATH: &str = "/xyz/openbmc_project/Chassis/Buttons/ID0";
pub const DEBUG_SELECTOR_PATH: &str = "/xyz/openbmc_project/Chassis/Buttons/DebugHostSelector";
pub const POWER_BUTTON_PATH: &str = "/xyz/openbmc_project/Chassis/Buttons/Power0";

// --- Runtime defaults ---
/// Location of the GPIO definitions file on the management controller.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/default/obmc/gpio/gpio_defs.json";
/// Root of the sysfs GPIO class directory.
pub const DEFAULT_SYSFS_GPIO_ROOT: &str = "/sys/class/gpio";
/// Interval between value-file scans of the sysfs line source.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 20;

/// A raw index is a `u32`, so a group may hold at most this many lines.
pub const MAX_GROUP_LINES: usize = 32;
/// Lines per bank in ASPEED-style pin names ("A0".."A7").
pub const PINS_PER_BANK: u32 = 8;
