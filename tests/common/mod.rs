#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

pub use ci_auto_test_utils::builders;
pub use ci_auto_test_utils::fake_remote::RemoteEvent;
pub use ci_auto_test_utils::fake_runner::exit;
pub use ci_auto_test_utils::{init_tracing, with_timeout, FakeCommandRunner, FakeRemote};

use ci_auto::config::ConfigFile;
use ci_auto::exec::CommandSpec;
use ci_auto::fs::RealFileSystem;
use ci_auto::job::JobContext;
use ci_auto::longjob::LongJobStore;

/// Write `contents` to `path`, creating parent directories.
pub fn write_file(path: impl AsRef<Path>, contents: &str) {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

/// The directory a `git clone` command will create: `<cwd>/<repo name>`.
pub fn clone_target(spec: &CommandSpec) -> PathBuf {
    let url = spec.args.last().unwrap();
    let name = url.rsplit('/').next().unwrap();
    spec.cwd.join(name)
}

/// Everything a test needs to build a `JobContext` against fakes.
pub struct Harness {
    pub remote: FakeRemote,
    pub runner: FakeCommandRunner,
    pub fs: RealFileSystem,
    pub store: LongJobStore,
    pub cfg: ConfigFile,
}

impl Harness {
    pub fn new(cfg: ConfigFile, remote: FakeRemote, runner: FakeCommandRunner) -> Self {
        let store = LongJobStore::new(cfg.machine.workdir.join("Longjob.jsonl"));
        Self {
            remote,
            runner,
            fs: RealFileSystem,
            store,
            cfg,
        }
    }

    pub fn ctx(&self) -> JobContext<'_> {
        JobContext {
            remote: &self.remote,
            runner: &self.runner,
            fs: &self.fs,
            poll: &self.cfg.poll,
            store: &self.store,
            token: "s3cret",
        }
    }
}
