//! # File Service
//!
//! Object-store style file access over an in-memory store. Paths are flat
//! keys; `/` only has meaning for prefix listing.
//!
//! | Operation | Signature | Returns |
//! |-----------|-----------|---------|
//! | `add` | `(string, bytes)` / `(string, string)` | null |
//! | `remove` | `(string)` | `true` if the path existed |
//! | `listFiles` | `(string)` / `()` | list of paths |
//! | `read` | `(string)` | bytes, deferred |

use parking_lot::RwLock;
use shared_types::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;
use vdp_dispatcher::{Deferred, OperationTable, ParamType, RemoteService, ServiceFault};

/// Registered service id.
pub const FILE_SERVICE: &str = "FileService";

/// In-memory object store exposed as a remote service.
#[derive(Debug, Default)]
pub struct FileService {
    store: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
}

impl FileService {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `contents` under `path`, replacing any previous object.
    pub fn add(&self, path: &str, contents: Vec<u8>) {
        debug!(path, len = contents.len(), "Storing object");
        self.store.write().insert(path.to_string(), contents);
    }

    /// Delete `path`. Returns false if nothing was stored there.
    pub fn remove(&self, path: &str) -> bool {
        self.store.write().remove(path).is_some()
    }

    /// Paths matching `pattern`.
    ///
    /// Without `*` the pattern is a key prefix, so `""` lists everything.
    /// With `*` the whole key must match, `*` standing for any run of
    /// characters.
    pub fn list_files(&self, pattern: &str) -> Vec<String> {
        let store = self.store.read();
        match pattern.find('*') {
            None => store
                .range(pattern.to_string()..)
                .take_while(|(path, _)| path.starts_with(pattern))
                .map(|(path, _)| path.clone())
                .collect(),
            Some(star) => {
                let prefix = &pattern[..star];
                store
                    .range(prefix.to_string()..)
                    .take_while(|(path, _)| path.starts_with(prefix))
                    .filter(|(path, _)| match_string(path, pattern))
                    .map(|(path, _)| path.clone())
                    .collect()
            }
        }
    }

    /// Contents of `path`.
    pub fn read(&self, path: &str) -> Option<Vec<u8>> {
        self.store.read().get(path).cloned()
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.store.read().len()
    }

    /// Returns true if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.store.read().is_empty()
    }
}

/// Wildcard match where `*` matches any sequence, including an empty one
/// and one containing `/`. Every other character matches itself.
pub fn match_string(value: &str, pattern: &str) -> bool {
    let value = value.as_bytes();
    let pattern = pattern.as_bytes();
    let (mut v, mut p) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while v < value.len() {
        if p < pattern.len() && pattern[p] == b'*' {
            backtrack = Some((p, v));
            p += 1;
        } else if p < pattern.len() && pattern[p] == value[v] {
            v += 1;
            p += 1;
        } else if let Some((star, matched)) = backtrack {
            // Let the last star absorb one more character.
            p = star + 1;
            v = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|&c| c == b'*')
}

fn paths(list: Vec<String>) -> Value {
    Value::List(list.into_iter().map(Value::String).collect())
}

impl RemoteService for FileService {
    fn operations(table: &mut OperationTable<Self>) {
        table
            .sync("add", &[ParamType::String, ParamType::Bytes], |svc, _, args| {
                svc.add(args.str(0)?, args.bytes(1)?.to_vec());
                Ok(Value::Null)
            })
            .sync("add", &[ParamType::String, ParamType::String], |svc, _, args| {
                svc.add(args.str(0)?, args.str(1)?.as_bytes().to_vec());
                Ok(Value::Null)
            })
            .sync("remove", &[ParamType::String], |svc, _, args| {
                Ok(Value::Bool(svc.remove(args.str(0)?)))
            })
            .sync("listFiles", &[ParamType::String], |svc, _, args| {
                Ok(paths(svc.list_files(args.opt_str(0)?.unwrap_or_default())))
            })
            .sync("listFiles", &[], |svc, _, _| Ok(paths(svc.list_files(""))))
            .deferred("read", &[ParamType::String], |svc, _, args| {
                let path = args.str(0)?.to_string();
                let store = Arc::clone(&svc.store);
                Ok(Some(Deferred::spawn(async move {
                    let contents = store.read().get(&path).cloned();
                    contents.map(Value::Bytes).ok_or_else(|| {
                        ServiceFault::processing(format!("file '{path}' not found"))
                    })
                })))
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> FileService {
        let files = FileService::new();
        files.add("folder1/folder2/a.csv", b"a".to_vec());
        files.add("folder1/folder2/b.csv", b"b".to_vec());
        files.add("folder1/sample", b"s".to_vec());
        files
    }

    #[test]
    fn test_match_string() {
        assert!(match_string("dddd", "dd*d"));
        assert!(match_string("folder1/sample", "folder1/samp*"));
        assert!(match_string("folder1/sample", "folder1/*le"));
        assert!(!match_string("folder1/sample", "folder1/san*"));
    }

    #[test]
    fn test_match_string_edges() {
        assert!(match_string("", ""));
        assert!(match_string("", "*"));
        assert!(match_string("abc", "*"));
        assert!(match_string("abc", "a**c"));
        assert!(!match_string("abc", "ab"));
        assert!(!match_string("ab", "abc"));
        assert!(match_string("a/b/c.txt", "*.txt"));
        assert!(!match_string("a/b/c.txt", "*.csv"));
    }

    #[test]
    fn test_remove_unknown_path() {
        let files = FileService::new();
        assert!(!files.remove("sl"));
    }

    #[test]
    fn test_remove_existing() {
        let files = sample();
        assert!(files.remove("folder1/sample"));
        assert!(!files.remove("folder1/sample"));
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_list_by_prefix() {
        let files = sample();
        assert_eq!(files.list_files("folder1/folder2").len(), 2);
        assert_eq!(files.list_files("").len(), 3);
        assert!(files.list_files("folder3").is_empty());
    }

    #[test]
    fn test_list_by_wildcard() {
        let files = sample();
        assert_eq!(
            files.list_files("folder1/*.csv"),
            vec!["folder1/folder2/a.csv", "folder1/folder2/b.csv"]
        );
        assert_eq!(files.list_files("folder1/samp*"), vec!["folder1/sample"]);
        assert!(files.list_files("folder1/san*").is_empty());
    }

    #[test]
    fn test_add_empty_path() {
        let files = FileService::new();
        files.add("", Vec::new());
        assert_eq!(files.read(""), Some(Vec::new()));
    }

    #[test]
    fn test_deferred_read_outside_runtime_completes_at_once() {
        let files = Arc::new(sample());
        let ops = {
            let mut table = OperationTable::new();
            FileService::operations(&mut table);
            table.bind(files)
        };
        let read = ops.iter().find(|op| op.name() == "read").unwrap();
        let ctx = vdp_dispatcher::CallContext {
            session_id: "s".into(),
            logging_context: "FILES".into(),
            correlation_key: shared_types::CorrelationKey::new(),
        };

        let reply = read.invoke(&ctx, &[Value::from("folder1/sample")]).unwrap();
        let vdp_dispatcher::Reply::Deferred(Some(deferred)) = reply else {
            panic!("expected a deferred reply");
        };
        assert!(deferred.is_completed());
    }

    #[test]
    fn test_deferred_read_on_runtime() {
        let files = Arc::new(sample());
        let mut table = OperationTable::new();
        FileService::operations(&mut table);
        let ops = table.bind(files);
        let read = ops.iter().find(|op| op.name() == "read").unwrap();
        let ctx = vdp_dispatcher::CallContext {
            session_id: "s".into(),
            logging_context: "FILES".into(),
            correlation_key: shared_types::CorrelationKey::new(),
        };

        let rt = tokio::runtime::Runtime::new().unwrap();
        let completion = rt.block_on(async {
            let reply = read.invoke(&ctx, &[Value::from("missing")]).unwrap();
            let vdp_dispatcher::Reply::Deferred(Some(deferred)) = reply else {
                panic!("expected a deferred reply");
            };
            let (tx, rx) = tokio::sync::oneshot::channel();
            deferred.on_complete(move |c| {
                let _ = tx.send(c);
            });
            rx.await.unwrap()
        });
        assert_eq!(completion.unwrap_err().message(), "file 'missing' not found");
    }
}
