//! Decides whether any effect may start.

use crate::error::EffectError;

/// What the gate needs to know about the host.
pub trait Environment {
    /// Try to create a rendering context on a throwaway surface.
    /// `Ok(false)` and `Err` both mean "no GPU".
    fn probe_gpu(&self) -> Result<bool, EffectError>;

    fn prefers_reduced_motion(&self) -> bool;
}

/// Capability gate. The GPU probe runs once; the motion preference is
/// re-read on every check because the user can flip it at any time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CapabilityGate {
    gpu_supported: bool,
}

impl CapabilityGate {
    pub fn probe(env: &impl Environment) -> Self {
        let gpu_supported = match env.probe_gpu() {
            Ok(supported) => supported,
            Err(err) => {
                log::warn!("GPU capability probe failed: {err}");
                false
            }
        };
        log::info!("GPU rendering supported: {gpu_supported}");
        Self { gpu_supported }
    }

    pub fn gpu_supported(&self) -> bool {
        self.gpu_supported
    }

    pub fn can_run(&self, env: &impl Environment) -> bool {
        if !self.gpu_supported {
            log::info!("effects disabled: no GPU rendering context");
            return false;
        }
        if env.prefers_reduced_motion() {
            log::info!("effects disabled: reduced motion requested");
            return false;
        }
        true
    }
}

/// One-shot form of the gate: probe and check in a single call.
pub fn can_run(env: &impl Environment) -> bool {
    CapabilityGate::probe(env).can_run(env)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::StubEnvironment;

    #[test]
    fn runs_with_gpu_and_motion() {
        let env = StubEnvironment { gpu: Ok(true), reduced_motion: false };
        assert!(can_run(&env));
    }

    #[test]
    fn probe_error_disables() {
        let env = StubEnvironment {
            gpu: Err(EffectError::Js("SecurityError".into())),
            reduced_motion: false,
        };
        assert!(!can_run(&env));
        assert!(!CapabilityGate::probe(&env).gpu_supported());
    }

    #[test]
    fn missing_context_disables() {
        let env = StubEnvironment { gpu: Ok(false), reduced_motion: false };
        assert!(!can_run(&env));
    }

    #[test]
    fn reduced_motion_disables() {
        let env = StubEnvironment { gpu: Ok(true), reduced_motion: true };
        let gate = CapabilityGate::probe(&env);
        assert!(gate.gpu_supported());
        assert!(!gate.can_run(&env));
    }
}
