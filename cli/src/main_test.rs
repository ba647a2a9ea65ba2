mod tests {
    use crate::*;

    #[test]
    fn test_trace_toggle_off_values() {
        for off in ["", "  ", "0", "false", "Off", "FALSE"] {
            assert_eq!(TraceToggle::parse(off), TraceToggle::Off, "{:?}", off);
        }
    }

    #[test]
    fn test_trace_toggle_default_values() {
        for on in ["1", "true", "ON", " True "] {
            assert_eq!(TraceToggle::parse(on), TraceToggle::Default, "{:?}", on);
        }
    }

    #[test]
    fn test_trace_toggle_custom_filter_keeps_case() {
        assert_eq!(
            TraceToggle::parse(" kernelbench_core=TRACE "),
            TraceToggle::Filter("kernelbench_core=TRACE".to_string())
        );
    }

    #[test]
    fn test_cli_args_parse_kernel_flags() {
        let args = CliArgs::try_parse_from(["kernelbench", "fibonacci", "--terms", "10", "--repeats", "2"])
            .expect("should parse");
        assert_eq!(args.command.kernel_key(), Some("fibonacci"));

        let mut workload = WorkloadConfig::default();
        args.command.apply_overrides(&mut workload);
        assert_eq!(workload.fibonacci_terms, 10);
        assert_eq!(workload.fibonacci_repeats, 2);
        assert_eq!(workload.batch_size, 10_000);
    }

    #[test]
    fn test_cli_args_require_subcommand() {
        assert!(CliArgs::try_parse_from(["kernelbench"]).is_err());
    }

    #[test]
    fn test_global_config_flag_after_subcommand() {
        let args = CliArgs::try_parse_from(["kernelbench", "objects", "--config", "w.toml"]).expect("should parse");
        assert_eq!(args.config.as_deref(), Some(Path::new("w.toml")));
        assert_eq!(args.command.kernel_key(), Some("objects_arrays"));
    }

    #[test]
    fn test_flags_override_config_file() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("workload.toml");
        std::fs::write(&path, "batch_size = 7\nseries_terms = 3\n")?;

        let command = Commands::Objects { size: Some(2) };
        let workload = resolve_workload(Some(&path), &command)?;
        assert_eq!(workload.batch_size, 2);
        assert_eq!(workload.series_terms, 3);
        Ok(())
    }

    #[test]
    fn test_verify_rejects_unknown_key() {
        let err = run_verify(&["nope".to_string()], &WorkloadConfig::default()).unwrap_err();
        assert!(err.to_string().contains("unknown scenario 'nope'"));
    }
}
