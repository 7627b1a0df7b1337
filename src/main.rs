use std::collections::HashSet;
use std::path::Path;

use contract_candidates::{derive_candidates, emit_files, enumerate_inputs, read_analysis, sha256_hex, validate_config, EnumerateError};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn main() {
    // One JSON event per pipeline step on stderr
    tracing_subscriber::fmt()
        .json()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args: Vec<String> = std::env::args().collect();
    let pretty = args.iter().any(|a| a == "--pretty");
    let mut config_path = String::from("candidates.yaml");
    if let Some(pos) = args.iter().position(|a| a == "--config") {
        if let Some(val) = args.get(pos + 1) {
            if !val.starts_with("--") {
                config_path = val.clone();
            }
        }
    }
    let mut per_doc_dir_on = true; // default on
    if let Some(val) = args.iter().find(|a| a.starts_with("--per-doc-dir")) {
        if let Some(eqpos) = val.find('=') {
            per_doc_dir_on = &val[eqpos + 1..] != "off";
        }
    }

    let mut used_doc_ids: HashSet<String> = HashSet::new();

    fn slugify(base: &str) -> String {
        let mut collapsed = String::with_capacity(base.len());
        let mut prev_dash = true;
        for ch in base.to_lowercase().chars() {
            if ch.is_ascii_alphanumeric() {
                collapsed.push(ch);
                prev_dash = false;
            } else if !prev_dash {
                collapsed.push('-');
                prev_dash = true;
            }
        }
        let trimmed = collapsed.trim_end_matches('-');
        if trimmed.is_empty() { "template".to_string() } else { trimmed.to_string() }
    }

    fn unique_slug(slug_in: String, used: &mut HashSet<String>) -> String {
        if used.insert(slug_in.clone()) {
            return slug_in;
        }
        let mut i = 1;
        loop {
            let candidate = format!("{}-{}", slug_in, i);
            if used.insert(candidate.clone()) {
                return candidate;
            }
            i += 1;
        }
    }

    // 1) Read and validate config
    let cfg = match validate_config(Path::new(&config_path)) {
        Ok(c) => c,
        Err(e) => {
            error!(tool = "validate_config", file = %config_path, error = %e, error_code = 3);
            std::process::exit(3);
        }
    };
    info!(tool = "validate_config", file = %config_path, status = "ok", input_glob = %cfg.input_glob(), output_dir = %cfg.output_dir());
    let vocab = cfg.vocabulary();

    // 2) Enumerate analysis results
    let files = match enumerate_inputs(&cfg.input_glob()) {
        Ok(files) => files,
        Err(EnumerateError::NoFilesFound { guidance }) => {
            error!(tool = "enumerate_inputs", error = "NoFilesFound", error_code = 1);
            eprintln!("{}", guidance);
            std::process::exit(1);
        }
    };
    info!(tool = "enumerate_inputs", count = files.len());

    // 3) Per file: read -> derive -> emit
    for file in files {
        let started = chrono::Utc::now();
        let stem = file.file_stem().and_then(|s| s.to_str()).unwrap_or("template").to_string();
        let doc_id = unique_slug(slugify(&stem), &mut used_doc_ids);
        let base_output = cfg.output_dir();
        let doc_outdir = if per_doc_dir_on { format!("{}/{}", base_output, doc_id) } else { base_output };

        let input = match read_analysis(&file) {
            Ok(i) => i,
            Err(e) => {
                error!(tool = "read_analysis", file = %file.display(), error = %e, error_code = 1);
                std::process::exit(1);
            }
        };

        let extraction = derive_candidates(&input.result, &vocab);
        info!(
            tool = "derive_candidates",
            file = %file.display(),
            anchors = extraction.anchor_count,
            candidates = extraction.candidates.len(),
            ambiguous = extraction.ambiguous_count(),
            clause_blocks = extraction.clause_blocks.len()
        );
        for d in &extraction.diagnostics {
            warn!(tool = "derive_candidates", file = %file.display(), diagnostic = ?d);
        }

        let payload = serde_json::json!({
            "templateId": doc_id,
            "candidates": extraction.candidates,
            "clauseBlocks": extraction.clause_blocks,
        });
        let finished = chrono::Utc::now();
        let payload_fingerprint = sha256_hex(&serde_json::to_vec(&payload).unwrap_or_default());
        let meta = serde_json::json!({
            "doc_id": doc_id,
            "config_id": cfg.id,
            "source": file,
            "input_sha256": input.sha256,
            "candidates_fingerprint": payload_fingerprint,
            "anchor_count": extraction.anchor_count,
            "candidate_count": extraction.candidates.len(),
            "ambiguous_count": extraction.ambiguous_count(),
            "diagnostics": extraction.diagnostics,
            "timestamps": {"started": started.to_rfc3339(), "finished": finished.to_rfc3339()},
            "expires_at": (finished + cfg.ttl()).to_rfc3339(),
        });

        match emit_files(&payload, &meta, &doc_outdir, &doc_id, pretty) {
            Ok(paths) => {
                info!(tool = "emit_files", file = %file.display(), candidates_path = %paths.candidates_path, meta_path = %paths.meta_path);
            }
            Err(e) => {
                error!(tool = "emit_files", file = %file.display(), error = %e, error_code = 6);
                std::process::exit(6);
            }
        }
    }
}
