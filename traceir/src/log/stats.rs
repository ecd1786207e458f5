//! Statistics about how much work the optimiser saved while recording a trace.

use std::{env, fs, sync::LazyLock};
use strum::{Display, EnumCount, EnumIter, IntoEnumIterator};

/// Where `TRACEIR_LOG_STATS` asked for statistics to be written (`-` for stderr).
static LOG_STATS: LazyLock<Option<String>> = LazyLock::new(|| env::var("TRACEIR_LOG_STATS").ok());

/// The events counted during one recording session.
#[repr(u8)]
#[derive(Copy, Clone, Debug, Display, EnumCount, EnumIter, PartialEq)]
// The `to_string` of each variant is the key under which it appears in the JSON output.
pub enum Stat {
    /// A new instruction was appended.
    #[strum(to_string = "instructions_emitted")]
    InstEmitted,
    /// A new constant was appended.
    #[strum(to_string = "constants_interned")]
    ConstInterned,
    /// An instruction was found to be equivalent to an earlier one.
    #[strum(to_string = "cse_hits")]
    CseHit,
    /// A literal was found to be already interned.
    #[strum(to_string = "intern_hits")]
    InternHit,
    /// The IR buffer's backing store was reallocated.
    #[strum(to_string = "growths")]
    Growth,
}

#[derive(Clone, Debug, Default)]
pub struct Stats {
    counts: [u64; Stat::COUNT],
}

impl Stats {
    pub(crate) fn incr(&mut self, stat: Stat) {
        self.counts[stat as usize] += 1;
    }

    pub fn get(&self, stat: Stat) -> u64 {
        self.counts[stat as usize]
    }

    /// If `TRACEIR_LOG_STATS` is set, write these statistics there.
    pub(crate) fn output(&self) {
        match LOG_STATS.as_deref() {
            Some("-") => eprintln!("{}", self.to_json()),
            Some(p) => {
                fs::write(p, self.to_json()).ok();
            }
            None => (),
        }
    }

    /// Turn these statistics into JSON. The output is sorted by field name so that tests can
    /// match it textually.
    pub fn to_json(&self) -> String {
        let mut fields = Stat::iter()
            .map(|x| (x.to_string(), self.get(x)))
            .collect::<Vec<_>>();
        fields.sort_unstable_by(|(k1, _), (k2, _)| k1.cmp(k2));
        format!(
            r#"{{
    {}
}}"#,
            fields
                .iter()
                .map(|(x, y)| format!(r#""{x}": {y}"#))
                .collect::<Vec<_>>()
                .join(",\n    ")
        )
    }
}
