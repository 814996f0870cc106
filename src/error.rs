/* Copyright (C) 2022 Antmicro
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     https://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

use thiserror::Error;

use crate::ids::ArchSwitchId;
use crate::tables::FanInBucket;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RrGraphError {
    /// Programmer error: wrong-type accessor, mutation after the edges were
    /// read, out-of-order pipeline step.
    #[error("contract violation: {0}")]
    ContractViolation(String),
    /// A derived structure (edge ranges, partitions, node sets) does not match
    /// the data it was derived from.
    #[error("structural inconsistency in {what} at index {index}")]
    Structural { what: &'static str, index: usize },
    #[error("no graph switch for architecture switch {arch_switch} with fan-in {bucket:?}")]
    UnknownSwitch { arch_switch: ArchSwitchId, bucket: FanInBucket },
    #[error("switch {0} referenced by an edge is not in the switch table")]
    SwitchOutOfRange(usize),
    #[error("invalid ptc list `{0}`")]
    InvalidPtcList(String),
    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, RrGraphError>;

impl RrGraphError {
    pub fn contract<S: Into<String>>(msg: S) -> Self {
        Self::ContractViolation(msg.into())
    }

    /// Builds a structural error and reports the offending index right away,
    /// callers are expected to abandon the construction run.
    pub fn structural(what: &'static str, index: usize) -> Self {
        err_log!("{} broken at index {}", what, index);
        Self::Structural { what, index }
    }
}

/* Accessor-level contract checks. Debug builds stop at the first violation,
 * release builds report it and hand back the fallback value. */
macro_rules! contract_violation {
    ($fallback:expr, $fmt:literal $(, $v:expr )* $(,)?) => {{
        let msg = format!($fmt $(, $v )*);
        if cfg!(debug_assertions) {
            panic!("contract violation: {}", msg);
        }
        err_log!("contract violation: {}", msg);
        $fallback
    }};
}
