// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

/// The operator name, used as the controller name in logs
pub const OPERATOR_NAME: &str = "dexpose";

/// Shape of the Service created for each Deployment
pub mod service {
    /// Port exposed by the Service and targeted by the Ingress backend
    pub const PORT: i32 = 80;
    /// Logical name of the single Service port
    pub const PORT_NAME: &str = "http";
}

/// Shape of the Ingress created for each Service
pub mod ingress {
    /// Path matching mode of the single HTTP path
    pub const PATH_TYPE: &str = "Prefix";
    /// Rewrite annotation understood by ingress-nginx
    pub const REWRITE_TARGET_ANNOTATION: &str = "nginx.ingress.kubernetes.io/rewrite-target";
    pub const REWRITE_TARGET: &str = "/";
}

/// Per-item retry backoff of the work queue
pub mod backoff {
    use std::time::Duration;

    /// Delay after the first failure, doubled for every following one
    pub const BASE_DELAY: Duration = Duration::from_millis(5);
    /// Upper bound for the per-item delay
    pub const MAX_DELAY: Duration = Duration::from_secs(1000);
}

pub mod worker {
    use std::time::Duration;

    /// Pause before a worker that died early is started again
    pub const RESTART_DELAY: Duration = Duration::from_secs(1);
}

/// Defaults for values read from the environment
pub mod defaults {
    pub const WORKERS: usize = 1;
    pub const MAX_RETRIES: u32 = 5;
}
