// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Spawning of background revalidations.

use tokio::runtime::Handle;

#[derive(Debug, Clone, Default)]
pub(crate) struct Runtime {
    handle: Option<Handle>,
}

impl Runtime {
    pub(crate) const fn new(handle: Option<Handle>) -> Self {
        Self { handle }
    }

    /// Runs `work` in the background on the configured runtime, or on the ambient Tokio runtime
    /// when none was configured.
    ///
    /// Returns `false` when there is no runtime to run on; `work` is dropped unpolled.
    pub(crate) fn spawn<T>(&self, work: T) -> bool
    where
        T: Future<Output = ()> + Send + 'static,
    {
        let handle = self.handle.clone().or_else(|| Handle::try_current().ok());
        if let Some(handle) = handle {
            drop(handle.spawn(work));
            true
        } else {
            tracing::warn!("no Tokio runtime available, background revalidation skipped");
            drop(work);
            false
        }
    }
}
