use sidecar_relay_core::ProcessManagerFactory;

/// Platform-independent factory that selects the appropriate implementation at compile time
pub struct PlatformProcessManagerFactory;

impl ProcessManagerFactory for PlatformProcessManagerFactory {
    #[cfg(unix)]
    type Manager = sidecar_relay_unix::UnixProcessManager;

    fn create_process_manager() -> Self::Manager {
        #[cfg(unix)]
        return sidecar_relay_unix::UnixProcessManagerFactory::create_process_manager();
    }

    fn platform_name() -> &'static str {
        #[cfg(unix)]
        return sidecar_relay_unix::UnixProcessManagerFactory::platform_name();
    }
}

/// Process manager for the platform this crate was built for
pub type PlatformProcessManager = <PlatformProcessManagerFactory as ProcessManagerFactory>::Manager;
