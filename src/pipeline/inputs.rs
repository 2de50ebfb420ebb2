use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::error::PredictionError;
use crate::types::{Allowlist, InputRecord, PredictInput};

const WAV_SUFFIX: &str = ".wav";

/// Turns one input selector into the ordered records to score.
pub fn normalize_inputs(
    input: &PredictInput,
    allowlist: &Allowlist,
    dataset_name: &str,
) -> Result<Vec<InputRecord>, PredictionError> {
    match input {
        PredictInput::File(path) => {
            let allowed = resolve_allowlist(allowlist)?;
            if !path.exists() {
                return Err(PredictionError::not_found("file", path));
            }
            let records = vec![InputRecord::from_file(path.clone(), dataset_name)];
            apply_allowlist(records, allowed.as_ref(), allowlist)
        }
        PredictInput::Dir(dir) => {
            let allowed = resolve_allowlist(allowlist)?;
            if !dir.exists() {
                return Err(PredictionError::not_found("directory", dir));
            }
            let files = list_wav_files(dir)?;
            if files.is_empty() {
                return Err(PredictionError::invalid_argument(format!(
                    "no wav files found in {}",
                    dir.display()
                )));
            }
            let records = files
                .into_iter()
                .map(|path| InputRecord::from_file(path, dataset_name))
                .collect();
            apply_allowlist(records, allowed.as_ref(), allowlist)
        }
        PredictInput::Tensor { audio, .. } => {
            log_ignored_allowlist(allowlist);
            Ok(vec![InputRecord::from_tensor(audio.clone(), dataset_name)])
        }
        PredictInput::Tensors { audio, .. } => {
            log_ignored_allowlist(allowlist);
            if audio.is_empty() {
                return Err(PredictionError::invalid_argument(
                    "input_tensors must contain at least one tensor",
                ));
            }
            Ok(audio
                .iter()
                .map(|tensor| InputRecord::from_tensor(tensor.clone(), dataset_name))
                .collect())
        }
    }
}

/// Merges the inline names with the lines of the list file. `None` when no
/// allowlist was supplied at all.
pub(crate) fn resolve_allowlist(
    allowlist: &Allowlist,
) -> Result<Option<HashSet<String>>, PredictionError> {
    let mut names = allowlist.names.clone();

    if let Some(path) = &allowlist.path {
        if names.as_ref().is_some_and(|n| !n.is_empty()) {
            tracing::warn!(
                list_path = %path.display(),
                "both an inline allowlist and an allowlist file were provided; using their union"
            );
        }
        if !path.exists() {
            return Err(PredictionError::not_found("allowlist file", path));
        }
        let contents = std::fs::read_to_string(path)
            .map_err(|e| PredictionError::io("read allowlist file", e))?;
        names
            .get_or_insert_with(Vec::new)
            .extend(contents.lines().map(str::to_string));
    }

    Ok(names.map(|names| {
        names
            .iter()
            .map(|name| strip_wav_suffix(name).to_string())
            .collect()
    }))
}

fn apply_allowlist(
    records: Vec<InputRecord>,
    allowed: Option<&HashSet<String>>,
    allowlist: &Allowlist,
) -> Result<Vec<InputRecord>, PredictionError> {
    let Some(allowed) = allowed else {
        return Ok(records);
    };
    let before = records.len();
    let kept: Vec<InputRecord> = records
        .into_iter()
        .filter(|record| {
            record
                .file_path()
                .and_then(Path::file_name)
                .map(|name| allowed.contains(strip_wav_suffix(&name.to_string_lossy())))
                .unwrap_or(false)
        })
        .collect();

    if kept.is_empty() {
        let source = match &allowlist.path {
            Some(path) => path.display().to_string(),
            None => "inline allowlist".to_string(),
        };
        return Err(PredictionError::invalid_argument(format!(
            "none of the inputs were found in the allowlist: {source}"
        )));
    }
    tracing::debug!(before, after = kept.len(), "applied allowlist");
    Ok(kept)
}

fn list_wav_files(dir: &Path) -> Result<Vec<PathBuf>, PredictionError> {
    let entries =
        std::fs::read_dir(dir).map_err(|e| PredictionError::io("list input directory", e))?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| PredictionError::io("list input directory", e))?;
        let path = entry.path();
        let is_wav = path
            .file_name()
            .is_some_and(|name| name.to_string_lossy().ends_with(WAV_SUFFIX));
        if is_wav && path.is_file() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn strip_wav_suffix(name: &str) -> &str {
    name.strip_suffix(WAV_SUFFIX).unwrap_or(name)
}

fn log_ignored_allowlist(allowlist: &Allowlist) {
    if !allowlist.is_empty() {
        tracing::debug!("allowlist only applies to file inputs; ignoring it for tensors");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use candle_core::{DType, Device, Tensor};
    use tracing_subscriber::layer::SubscriberExt;

    use super::*;
    use crate::types::DEFAULT_DATASET_NAME;

    /// Collects the message of every WARN event.
    #[derive(Clone, Default)]
    struct WarnCapture(Arc<Mutex<Vec<String>>>);

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for WarnCapture {
        fn on_event(
            &self,
            event: &tracing::Event<'_>,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            if *event.metadata().level() != tracing::Level::WARN {
                return;
            }
            let mut visitor = MessageVisitor(String::new());
            event.record(&mut visitor);
            self.0.lock().unwrap().push(visitor.0);
        }
    }

    struct MessageVisitor(String);

    impl tracing::field::Visit for MessageVisitor {
        fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
            if field.name() == "message" {
                self.0 = format!("{value:?}");
            }
        }
    }

    fn with_warnings<T>(f: impl FnOnce() -> T) -> (T, Vec<String>) {
        let capture = WarnCapture::default();
        let subscriber = tracing_subscriber::registry().with(capture.clone());
        let out = tracing::subscriber::with_default(subscriber, f);
        let warnings = capture.0.lock().unwrap().clone();
        (out, warnings)
    }

    fn dir_with_list(list: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        touch_wavs(dir.path(), &["a.wav", "b.wav", "c.wav"]);
        let list_path = dir.path().join("val_list.txt");
        std::fs::write(&list_path, list).unwrap();
        (dir, list_path)
    }

    fn touch_wavs(dir: &Path, names: &[&str]) {
        for name in names {
            std::fs::write(dir.join(name), b"RIFF").expect("write fixture");
        }
    }

    fn file_names(records: &[InputRecord]) -> Vec<String> {
        records
            .iter()
            .map(|r| {
                r.file_path()
                    .and_then(Path::file_name)
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default()
            })
            .collect()
    }

    #[test]
    fn directory_listing_is_sorted_and_wav_only() {
        let dir = tempfile::tempdir().unwrap();
        touch_wavs(dir.path(), &["c.wav", "a.wav", "b.wav", "notes.txt", "d.WAV"]);
        std::fs::create_dir(dir.path().join("nested.wav")).unwrap();

        let records = normalize_inputs(
            &PredictInput::Dir(dir.path().to_path_buf()),
            &Allowlist::default(),
            DEFAULT_DATASET_NAME,
        )
        .unwrap();
        assert_eq!(file_names(&records), ["a.wav", "b.wav", "c.wav"]);
        assert!(records.iter().all(|r| r.dataset_name == "sarulab"));
    }

    #[test]
    fn empty_directory_is_invalid_argument() {
        let dir = tempfile::tempdir().unwrap();
        touch_wavs(dir.path(), &["readme.md"]);
        let err = normalize_inputs(
            &PredictInput::Dir(dir.path().to_path_buf()),
            &Allowlist::default(),
            DEFAULT_DATASET_NAME,
        )
        .unwrap_err();
        assert!(err.is_invalid_argument());
    }

    #[test]
    fn missing_file_and_directory_are_not_found() {
        let missing = PathBuf::from("/nonexistent/utmos/clip.wav");
        let err = normalize_inputs(
            &PredictInput::File(missing.clone()),
            &Allowlist::default(),
            DEFAULT_DATASET_NAME,
        )
        .unwrap_err();
        assert!(err.is_not_found());

        let err = normalize_inputs(
            &PredictInput::Dir(missing),
            &Allowlist::default(),
            DEFAULT_DATASET_NAME,
        )
        .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn inline_allowlist_filters_and_keeps_order() {
        let dir = tempfile::tempdir().unwrap();
        touch_wavs(dir.path(), &["a.wav", "b.wav", "c.wav"]);
        let allowlist = Allowlist {
            names: Some(vec!["c".to_string(), "a.wav".to_string()]),
            path: None,
        };
        let records = normalize_inputs(
            &PredictInput::Dir(dir.path().to_path_buf()),
            &allowlist,
            DEFAULT_DATASET_NAME,
        )
        .unwrap();
        assert_eq!(file_names(&records), ["a.wav", "c.wav"]);
    }

    #[test]
    fn allowlist_match_is_case_sensitive() {
        let dir = tempfile::tempdir().unwrap();
        touch_wavs(dir.path(), &["Speaker.wav"]);
        let allowlist = Allowlist {
            names: Some(vec!["speaker".to_string()]),
            path: None,
        };
        let err = normalize_inputs(
            &PredictInput::Dir(dir.path().to_path_buf()),
            &allowlist,
            DEFAULT_DATASET_NAME,
        )
        .unwrap_err();
        assert!(err.is_invalid_argument());
        assert!(err.to_string().contains("inline allowlist"));
    }

    #[test]
    fn allowlist_file_is_unioned_with_inline_names() {
        let dir = tempfile::tempdir().unwrap();
        touch_wavs(dir.path(), &["a.wav", "b.wav", "c.wav"]);
        let list_dir = tempfile::tempdir().unwrap();
        let list_path = list_dir.path().join("val_list.txt");
        std::fs::write(&list_path, "c.wav\n").unwrap();

        let allowlist = Allowlist {
            names: Some(vec!["a".to_string()]),
            path: Some(list_path),
        };
        let records = normalize_inputs(
            &PredictInput::Dir(dir.path().to_path_buf()),
            &allowlist,
            DEFAULT_DATASET_NAME,
        )
        .unwrap();
        assert_eq!(file_names(&records), ["a.wav", "c.wav"]);
    }

    #[test]
    fn both_allowlists_warn_once_and_still_succeed() {
        let (dir, list_path) = dir_with_list("b\n");
        let allowlist = Allowlist {
            names: Some(vec!["a".to_string()]),
            path: Some(list_path),
        };
        let (records, warnings) = with_warnings(|| {
            normalize_inputs(
                &PredictInput::Dir(dir.path().to_path_buf()),
                &allowlist,
                DEFAULT_DATASET_NAME,
            )
        });
        assert_eq!(file_names(&records.unwrap()), ["a.wav", "b.wav"]);
        assert_eq!(warnings.len(), 1, "{warnings:?}");
        assert!(warnings[0].contains("both an inline allowlist and an allowlist file"));
    }

    #[test]
    fn single_or_empty_inline_allowlist_does_not_warn() {
        let (dir, list_path) = dir_with_list("c.wav\n");
        for names in [None, Some(Vec::new())] {
            let allowlist = Allowlist {
                names,
                path: Some(list_path.clone()),
            };
            let (records, warnings) = with_warnings(|| {
                normalize_inputs(
                    &PredictInput::Dir(dir.path().to_path_buf()),
                    &allowlist,
                    DEFAULT_DATASET_NAME,
                )
            });
            assert_eq!(file_names(&records.unwrap()), ["c.wav"]);
            assert!(warnings.is_empty(), "{warnings:?}");
        }

        let inline_only = Allowlist {
            names: Some(vec!["a".to_string()]),
            path: None,
        };
        let (records, warnings) = with_warnings(|| {
            normalize_inputs(
                &PredictInput::Dir(dir.path().to_path_buf()),
                &inline_only,
                DEFAULT_DATASET_NAME,
            )
        });
        assert_eq!(file_names(&records.unwrap()), ["a.wav"]);
        assert!(warnings.is_empty(), "{warnings:?}");
    }

    #[test]
    fn missing_allowlist_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        touch_wavs(dir.path(), &["a.wav"]);
        let allowlist = Allowlist {
            names: None,
            path: Some(dir.path().join("missing.txt")),
        };
        let err = normalize_inputs(
            &PredictInput::Dir(dir.path().to_path_buf()),
            &allowlist,
            DEFAULT_DATASET_NAME,
        )
        .unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn filtered_to_nothing_names_the_list_file() {
        let dir = tempfile::tempdir().unwrap();
        touch_wavs(dir.path(), &["a.wav"]);
        let list_path = dir.path().join("val.txt");
        std::fs::write(&list_path, "zzz\n").unwrap();
        let allowlist = Allowlist {
            names: None,
            path: Some(list_path.clone()),
        };
        let err = normalize_inputs(
            &PredictInput::File(dir.path().join("a.wav")),
            &allowlist,
            DEFAULT_DATASET_NAME,
        )
        .unwrap_err();
        assert!(err.is_invalid_argument());
        assert!(err.to_string().contains(&list_path.display().to_string()));
    }

    #[test]
    fn tensors_become_records_and_skip_allowlist() {
        let audio = Tensor::zeros(16, DType::F32, &Device::Cpu).unwrap();
        let allowlist = Allowlist {
            names: None,
            path: Some(PathBuf::from("/nonexistent/list.txt")),
        };
        let records = normalize_inputs(
            &PredictInput::Tensors {
                audio: vec![audio.clone(), audio],
                sample_rate: 16_000,
            },
            &allowlist,
            "custom",
        )
        .unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.file_path().is_none()));
        assert!(records.iter().all(|r| r.dataset_name == "custom"));
    }

    #[test]
    fn empty_tensor_list_is_invalid_argument() {
        let err = normalize_inputs(
            &PredictInput::Tensors {
                audio: Vec::new(),
                sample_rate: 16_000,
            },
            &Allowlist::default(),
            DEFAULT_DATASET_NAME,
        )
        .unwrap_err();
        assert!(err.is_invalid_argument());
    }
}
