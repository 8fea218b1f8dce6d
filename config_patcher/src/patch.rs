use crate::error::PatchError;
use crate::model::{AppendRule, OverrideRule};
use rand::distr::Alphanumeric;
use rand::{Rng, rng};
use regex::bytes::{NoExpand, Regex};
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum AppliedPatch {
    /// `replaced == 0` 表示没有匹配的行
    Override {
        file: PathBuf,
        pattern: String,
        replaced: usize,
    },
    Append {
        file: PathBuf,
        lines: usize,
    },
}

#[derive(Debug)]
pub struct PatchFailure {
    pub file: PathBuf,
    /// 规则级失败时为对应的 pattern
    pub rule: Option<String>,
    pub error: PatchError,
}

#[derive(Debug, Default)]
pub struct PatchReport {
    pub applied: Vec<AppliedPatch>,
    pub failures: Vec<PatchFailure>,
}

impl PatchReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn no_ops(&self) -> impl Iterator<Item = &AppliedPatch> {
        self.applied
            .iter()
            .filter(|p| matches!(p, AppliedPatch::Override { replaced: 0, .. }))
    }

    fn fail(&mut self, file: &Path, rule: Option<&str>, error: PatchError) {
        warn!("Patch failed for {}: {}", file.display(), error);
        self.failures.push(PatchFailure {
            file: file.to_path_buf(),
            rule: rule.map(str::to_string),
            error,
        });
    }
}

/// 按目录顺序执行替换，单个文件失败不影响其他文件
pub fn apply_overrides(rules: &[OverrideRule], debug: bool) -> PatchReport {
    let mut report = PatchReport::default();
    for (file, file_rules) in group_by_file(rules) {
        info!("Overriding properties at {}", file.display());
        override_file(file, &file_rules, &mut report, write_atomic);

        if debug {
            match fs::read(file) {
                Ok(content) => info!(
                    "Reviewing changes for {}\n{}",
                    file.display(),
                    String::from_utf8_lossy(&content)
                ),
                Err(e) => warn!("Cannot review {}: {}", file.display(), e),
            }
        }
    }
    report
}

/// 按字节处理，非 UTF-8 的 properties 文件（ISO-8859-1）也能替换
fn override_file(
    file: &Path,
    rules: &[&OverrideRule],
    report: &mut PatchReport,
    write: fn(&Path, &[u8]) -> io::Result<()>,
) {
    // 替换规则不创建文件
    let original = match fs::read(file) {
        Ok(c) => c,
        Err(source) => {
            for rule in rules {
                let error = PatchError::Read {
                    path: file.to_path_buf(),
                    source: io::Error::new(source.kind(), source.to_string()),
                };
                report.fail(file, Some(rule.match_pattern.as_str()), error);
            }
            return;
        }
    };

    // 写回成功后才计入 applied
    let mut applied = Vec::with_capacity(rules.len());
    let mut content = original.clone();
    for rule in rules {
        let re = match Regex::new(&rule.match_pattern) {
            Ok(re) => re,
            Err(source) => {
                let error = PatchError::InvalidPattern {
                    pattern: rule.match_pattern.clone(),
                    source,
                };
                report.fail(file, Some(rule.match_pattern.as_str()), error);
                continue;
            }
        };
        let (patched, replaced) = replace_lines(&content, &re, rule.replacement_line.as_bytes());
        if replaced == 0 {
            debug!("No line matches {} in {}", rule.match_pattern, file.display());
        }
        content = patched;
        applied.push((*rule, replaced));
    }

    if content != original {
        if let Err(source) = write(file, &content) {
            for (rule, _) in applied.iter().filter(|(_, replaced)| *replaced > 0) {
                let error = PatchError::Write {
                    path: file.to_path_buf(),
                    source: io::Error::new(source.kind(), source.to_string()),
                };
                report.fail(file, Some(rule.match_pattern.as_str()), error);
            }
            return;
        }
    }
    report
        .applied
        .extend(applied.into_iter().map(|(rule, replaced)| AppliedPatch::Override {
            file: file.to_path_buf(),
            pattern: rule.match_pattern.clone(),
            replaced,
        }));
}

/// 逐行替换，保留原有换行符；返回新内容和命中的行数
pub fn replace_lines(content: &[u8], re: &Regex, replacement: &[u8]) -> (Vec<u8>, usize) {
    let mut out = Vec::with_capacity(content.len());
    let mut replaced = 0;
    for line in content.split_inclusive(|b| *b == b'\n') {
        let (body, ending) = split_line_ending(line);
        if re.is_match(body) {
            replaced += 1;
            out.extend_from_slice(&re.replace_all(body, NoExpand(replacement)));
        } else {
            out.extend_from_slice(body);
        }
        out.extend_from_slice(ending);
    }
    (out, replaced)
}

fn split_line_ending(line: &[u8]) -> (&[u8], &[u8]) {
    let ending = if line.ends_with(b"\r\n") {
        2
    } else if line.ends_with(b"\n") {
        1
    } else {
        0
    };
    line.split_at(line.len() - ending)
}

fn group_by_file(rules: &[OverrideRule]) -> Vec<(&Path, Vec<&OverrideRule>)> {
    let mut groups: Vec<(&Path, Vec<&OverrideRule>)> = Vec::new();
    for rule in rules {
        match groups
            .iter_mut()
            .find(|(file, _)| *file == rule.target_file.as_path())
        {
            Some((_, group)) => group.push(rule),
            None => groups.push((rule.target_file.as_path(), vec![rule])),
        }
    }
    groups
}

fn random_suffix(length: usize) -> String {
    let mut rng = rng();
    (0..length)
        .map(|_| rng.sample(Alphanumeric))
        .map(char::from)
        .collect()
}

/// 先写同目录临时文件再 rename
fn write_atomic(path: &Path, content: &[u8]) -> io::Result<()> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp_path = path.with_file_name(format!(".{}.tmp-{}", name, random_suffix(8)));
    let permissions = fs::metadata(path)?.permissions();

    fs::write(&tmp_path, content)?;
    let result =
        fs::set_permissions(&tmp_path, permissions).and_then(|_| fs::rename(&tmp_path, path));
    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    result
}

/// 追加写入（不存在则创建），不自动补换行
pub fn apply_appends(rules: &[AppendRule]) -> PatchReport {
    let mut report = PatchReport::default();
    for rule in rules {
        info!("Appending properties to {}", rule.target_file.display());
        let text = rule.lines.join("\n");
        debug!("Appending properties:\n{}", text);
        match append_to(&rule.target_file, &text) {
            Ok(()) => report.applied.push(AppliedPatch::Append {
                file: rule.target_file.clone(),
                lines: rule.lines.len(),
            }),
            Err(source) => {
                let error = PatchError::Append {
                    path: rule.target_file.clone(),
                    source,
                };
                report.fail(&rule.target_file, None, error);
            }
        }
    }
    report
}

fn append_to(path: &Path, text: &str) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.append(true).create(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o666);
    }
    let mut file = options.open(path)?;
    file.write_all(text.as_bytes())?;
    file.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn rule(file: &Path, pattern: &str, replacement: &str) -> OverrideRule {
        OverrideRule {
            target_file: file.to_path_buf(),
            match_pattern: pattern.to_string(),
            replacement_line: replacement.to_string(),
        }
    }

    fn replace(content: &str, pattern: &str, replacement: &str) -> (String, usize) {
        let re = Regex::new(pattern).unwrap();
        let (out, n) = replace_lines(content.as_bytes(), &re, replacement.as_bytes());
        (String::from_utf8(out).unwrap(), n)
    }

    #[test]
    fn replaces_substring_within_line() {
        let (out, n) = replace("url=jdbc://database:5432/db\n", "://database", "://localhost");
        assert_eq!(out, "url=jdbc://localhost:5432/db\n");
        assert_eq!(n, 1);
    }

    #[test]
    fn anchored_pattern_replaces_whole_line_and_keeps_endings() {
        let (out, n) = replace(
            "A=1\r\nES_HOSTNAME=oldhost\r\nB=2",
            "^ES_HOSTNAME=.*$",
            "ES_HOSTNAME=127.0.0.1",
        );
        assert_eq!(out, "A=1\r\nES_HOSTNAME=127.0.0.1\r\nB=2");
        assert_eq!(n, 1);
    }

    #[test]
    fn every_matching_line_is_replaced() {
        let (out, n) = replace(
            "felix.base.dir=a\nx=1\nfelix.base.dir=b\n",
            "^felix.base.dir=.*$",
            "felix.base.dir=/f",
        );
        assert_eq!(out, "felix.base.dir=/f\nx=1\nfelix.base.dir=/f\n");
        assert_eq!(n, 2);
    }

    #[test]
    fn replacement_is_literal() {
        let (out, _) = replace("path=old\n", "^path=(.*)$", "path=$1&x");
        assert_eq!(out, "path=$1&x\n");
    }

    #[test]
    fn latin1_file_is_patched_byte_for_byte() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("it-dotmarketing-config.properties");
        fs::write(&file, b"COMPANY=Soci\xe9t\xe9\nfelix.base.dir=/old\n").unwrap();

        let report = apply_overrides(
            &[rule(&file, "^felix.base.dir=.*$", "felix.base.dir=/ws/felix")],
            true,
        );

        assert!(report.is_clean(), "unexpected failures: {:?}", report.failures);
        assert_eq!(
            fs::read(&file).unwrap(),
            b"COMPANY=Soci\xe9t\xe9\nfelix.base.dir=/ws/felix\n".to_vec()
        );
    }

    #[test]
    fn no_match_leaves_file_untouched() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("cluster.properties");
        fs::write(&file, "ES_PORT=9200\n").unwrap();
        let before = fs::metadata(&file).unwrap().modified().unwrap();

        let report =
            apply_overrides(&[rule(&file, "^ES_HOSTNAME=.*$", "ES_HOSTNAME=127.0.0.1")], false);

        assert!(report.is_clean());
        assert_eq!(report.no_ops().count(), 1);
        assert_eq!(fs::read_to_string(&file).unwrap(), "ES_PORT=9200\n");
        assert_eq!(fs::metadata(&file).unwrap().modified().unwrap(), before);
    }

    #[test]
    fn applying_twice_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("db-config.properties");
        fs::write(&file, "url=jdbc://database:5432/db\n").unwrap();
        let rules = [rule(&file, "://database", "://localhost")];

        apply_overrides(&rules, false);
        let once = fs::read_to_string(&file).unwrap();
        let report = apply_overrides(&rules, true);
        let twice = fs::read_to_string(&file).unwrap();

        assert_eq!(once, "url=jdbc://localhost:5432/db\n");
        assert_eq!(once, twice);
        assert_eq!(report.no_ops().count(), 1);
    }

    #[test]
    fn rules_for_same_file_apply_in_order() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.properties");
        fs::write(&file, "key=one\n").unwrap();
        let rules = [
            rule(&file, "^key=one$", "key=two"),
            rule(&file, "^key=two$", "key=three"),
        ];

        apply_overrides(&rules, false);

        assert_eq!(fs::read_to_string(&file).unwrap(), "key=three\n");
    }

    #[test]
    fn failures_accumulate_and_later_files_still_run() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing.properties");
        let present = dir.path().join("present.properties");
        fs::write(&present, "ES_HOSTNAME=oldhost\n").unwrap();
        let rules = [
            rule(&missing, "^a=.*$", "a=1"),
            rule(&missing, "^b=.*$", "b=1"),
            rule(&present, "^ES_HOSTNAME=(.*$", "broken"),
            rule(&present, "^ES_HOSTNAME=.*$", "ES_HOSTNAME=127.0.0.1"),
        ];

        let report = apply_overrides(&rules, false);

        assert!(!missing.exists());
        assert_eq!(report.failures.len(), 3);
        assert!(
            report.failures[..2]
                .iter()
                .all(|f| f.file == missing && matches!(f.error, PatchError::Read { .. }))
        );
        assert!(matches!(report.failures[2].error, PatchError::InvalidPattern { .. }));
        assert_eq!(fs::read_to_string(&present).unwrap(), "ES_HOSTNAME=127.0.0.1\n");
    }

    fn failing_write(_: &Path, _: &[u8]) -> io::Result<()> {
        Err(io::Error::other("disk full"))
    }

    #[test]
    fn failed_rewrite_is_not_reported_as_applied() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("cluster.properties");
        fs::write(&file, "ES_HOSTNAME=oldhost\nES_PORT=9200\n").unwrap();
        let hostname = rule(&file, "^ES_HOSTNAME=.*$", "ES_HOSTNAME=127.0.0.1");
        let unmatched = rule(&file, "^es.path.home=.*$", "es.path.home=/es");
        let mut report = PatchReport::default();

        override_file(&file, &[&hostname, &unmatched], &mut report, failing_write);

        assert!(report.applied.is_empty());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].rule.as_deref(), Some("^ES_HOSTNAME=.*$"));
        assert!(matches!(report.failures[0].error, PatchError::Write { .. }));
        assert_eq!(
            fs::read_to_string(&file).unwrap(),
            "ES_HOSTNAME=oldhost\nES_PORT=9200\n"
        );
    }

    #[test]
    fn unchanged_file_skips_the_write() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("cluster.properties");
        fs::write(&file, "ES_PORT=9200\n").unwrap();
        let hostname = rule(&file, "^ES_HOSTNAME=.*$", "ES_HOSTNAME=127.0.0.1");
        let mut report = PatchReport::default();

        override_file(&file, &[&hostname], &mut report, failing_write);

        assert!(report.is_clean());
        assert_eq!(report.no_ops().count(), 1);
    }

    #[test]
    fn append_creates_missing_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("new.properties");
        let rules = [AppendRule {
            target_file: file.clone(),
            lines: vec!["a=1".into(), "b=2".into()],
        }];

        let report = apply_appends(&rules);

        assert!(report.is_clean());
        assert_eq!(fs::read_to_string(&file).unwrap(), "a=1\nb=2");
    }

    #[test]
    fn append_is_not_idempotent() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("override.yml");
        let rules = [AppendRule {
            target_file: file.clone(),
            lines: vec!["http.enabled: false\n".into()],
        }];

        for _ in 0..3 {
            apply_appends(&rules);
        }

        assert_eq!(fs::read_to_string(&file).unwrap(), "http.enabled: false\n".repeat(3));
    }

    #[test]
    fn append_into_missing_directory_is_recorded() {
        let dir = TempDir::new().unwrap();
        let bad = dir.path().join("nope/config.yml");
        let good = dir.path().join("config.yml");
        let rules = [
            AppendRule {
                target_file: bad.clone(),
                lines: vec!["x".into()],
            },
            AppendRule {
                target_file: good.clone(),
                lines: vec!["y".into()],
            },
        ];

        let report = apply_appends(&rules);

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].file, bad);
        assert_eq!(fs::read_to_string(&good).unwrap(), "y");
    }
}
