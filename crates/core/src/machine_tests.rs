// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn machine_yaml_parses() {
    let yaml = "\
provider_bins:
  claude: /usr/local/bin/claude
  gemini: /usr/local/bin/gemini
repo_roots:
  main: /home/dev/src/main
provider_pricing_usd_per_1k_tokens:
  claude:
    input: 0.003
    output: 0.015
";
    let cfg: MachineConfig = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(
        cfg.provider_bins.get(&Provider::Claude),
        Some(&PathBuf::from("/usr/local/bin/claude"))
    );
    assert_eq!(cfg.repo_roots.get("main"), Some(&PathBuf::from("/home/dev/src/main")));
    let pricing = cfg.pricing_for(Provider::Claude).unwrap();
    assert_eq!(pricing.output, 0.015);
}

#[test]
fn cost_scales_per_thousand_tokens() {
    let pricing = ProviderPricing { input: 0.003, cached_input: None, output: 0.015, reasoning_output: None };
    let cost = pricing.cost_usd(2000, 1000);
    assert!((cost - 0.021).abs() < 1e-9, "cost {cost}");
}

#[test]
fn missing_pricing_yields_none() {
    let cfg = MachineConfig::default();
    assert!(cfg.pricing_for(Provider::Gemini).is_none());
}

#[test]
fn empty_machine_yaml_is_valid() {
    let cfg: MachineConfig = serde_yaml::from_str("{}").unwrap();
    assert!(cfg.provider_bins.is_empty());
}
