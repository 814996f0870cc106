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

use std::collections::HashMap;
use std::borrow::Borrow;

use serde::Serialize;

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize)]
#[serde(transparent)]
pub struct StringId(u32);

impl StringId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Interning pool for strings owned by a single store. Every distinct string
/// is kept once and addressed by a `StringId`.
#[derive(Clone, Debug, Default)]
pub struct StringPool {
    strings: Vec<String>,
    revmap: HashMap<String, StringId>,
}

impl StringPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get an identifier for a provided string. Creates a new identifier if the
    /// string was not registered. Returns an existing identifier if the string has been
    /// already registered.
    pub fn create_string<S>(&mut self, s: S) -> StringId where
        S: ToString + Borrow<str>
    {
        if let Some(id) = self.revmap.get(s.borrow()) {
            return *id;
        }

        let id = StringId(self.strings.len() as u32);
        let s = s.to_string();
        self.revmap.insert(s.clone(), id);
        self.strings.push(s);

        id
    }

    pub fn find(&self, s: &str) -> Option<StringId> {
        self.revmap.get(s).copied()
    }

    pub fn get_string(&self, id: StringId) -> &str {
        &self.strings[id.index()]
    }

    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interning_is_idempotent() {
        let mut pool = StringPool::new();
        let a = pool.create_string("fasm_features");
        let b = pool.create_string(String::from("fasm_features"));
        let c = pool.create_string("comment");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.get_string(c), "comment");
        assert_eq!(pool.find("comment"), Some(c));
        assert_eq!(pool.find("missing"), None);
    }
}
