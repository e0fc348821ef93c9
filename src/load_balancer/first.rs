//! First-instance selection: the registry's order decides.

use crate::discovery::ServiceInstance;
use crate::load_balancer::InstanceSelector;

/// Always picks the first instance the registry returned.
#[derive(Debug, Default, Clone, Copy)]
pub struct FirstInstance;

impl InstanceSelector for FirstInstance {
    fn select(&self, _service: &str, instances: &[ServiceInstance]) -> Option<ServiceInstance> {
        instances.first().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_instance() {
        let instances = vec![
            ServiceInstance::new("10.0.0.1", 8080, "http"),
            ServiceInstance::new("10.0.0.2", 8080, "http"),
        ];
        for _ in 0..3 {
            assert_eq!(FirstInstance.select("svc", &instances).unwrap().host, "10.0.0.1");
        }
        assert!(FirstInstance.select("svc", &[]).is_none());
    }
}
