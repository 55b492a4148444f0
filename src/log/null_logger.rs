/*!

Used when the `logging` feature is off: nothing is written anywhere, but the public API behaves
the same and the `log` macros still honor the global level.

*/

use crate::log::LogConfiguration;

impl LogConfiguration {
    /// Sets the global max level to conform to this `LogConfiguration`.
    pub(in crate::log) fn set_config(&mut self) {
        log::set_max_level(self.global_log_level);
    }
}
