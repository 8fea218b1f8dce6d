use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::debug;

/// 配置键到取值的映射，一次运行内不可变
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct ValueMap(BTreeMap<String, String>);

impl ValueMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// 缺失的键返回空字符串
    pub fn resolve(&self, key: &str) -> &str {
        match self.0.get(key) {
            Some(value) => value,
            None => {
                debug!("Value for {} not provided, using empty string", key);
                ""
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ValueMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

pub fn resolve(map: &ValueMap, key: &str) -> String {
    map.resolve(key).to_string()
}
