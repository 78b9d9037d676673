use chrono::{Local, NaiveDate};
use std::sync::Arc;

use crate::config::AppConfig;
use crate::database::QueryExecutor;
use crate::domains::chain::ChainRegistry;
use crate::domains::export::engine::{EngineSettings, ExportEngine, ExportJob};
use crate::domains::export::naming::FILE_DATE_FORMAT;
use crate::domains::export::paths::OutputPathPolicy;
use crate::domains::export::progress::{GuardedProgressSink, ProgressSink};
use crate::domains::export::repository::{OutboundRepository, SqlOutboundRepository};
use crate::domains::export::source::{RecordDefaults, RecordSourceResolver};
use crate::domains::export::types::{ExportRequest, ExportSummary};
use crate::domains::export::validator::{RequestValidator, ValidatedRequest};
use crate::domains::reference::{ReferenceRepository, ReferenceValidator, SqlReferenceRepository, ValidationCache};
use crate::errors::{DomainError, ServiceError, ServiceResult};

/// Validate a request, resolve its record source, and run the export.
pub struct ExportService {
    validator: RequestValidator,
    reference: Option<Arc<ReferenceValidator>>,
    sources: RecordSourceResolver,
    engine: ExportEngine,
}

impl ExportService {
    pub fn new(
        validator: RequestValidator,
        reference: Option<Arc<ReferenceValidator>>,
        sources: RecordSourceResolver,
        engine: ExportEngine,
    ) -> Self {
        Self { validator, reference, sources, engine }
    }

    /// Wire the service from configuration. Without an executor, or with
    /// database validation turned off, only structural validation runs and
    /// every record is generated.
    pub fn from_config(
        config: &AppConfig,
        cache: Arc<ValidationCache>,
        executor: Option<Arc<dyn QueryExecutor>>,
    ) -> Self {
        let registry = Arc::new(ChainRegistry::builtin());
        let engine = ExportEngine::new(
            EngineSettings {
                max_records_per_file: config.max_records_per_file,
                batch_size: config.batch_size,
                package_archive: config.package_archive,
            },
            OutputPathPolicy::new(config.fallback_dir()),
        );

        let executor = executor.filter(|_| config.use_database_validation);
        match executor {
            Some(executor) => {
                let repo: Arc<dyn ReferenceRepository> = Arc::new(SqlReferenceRepository::new(Arc::clone(&executor)));
                let reference = Arc::new(ReferenceValidator::new(cache, repo));
                let outbound: Arc<dyn OutboundRepository> = Arc::new(SqlOutboundRepository::new(executor));
                Self::new(
                    RequestValidator::new(registry, Some(Arc::clone(&reference)), config.max_record_count),
                    Some(reference),
                    RecordSourceResolver::new(Some(outbound), config.outbound_fetch_limit),
                    engine,
                )
            }
            None => {
                log::info!("Database validation disabled, using basic validation only");
                Self::new(
                    RequestValidator::structural(registry, config.max_record_count),
                    None,
                    RecordSourceResolver::procedural_only(),
                    engine,
                )
            }
        }
    }

    pub fn engine(&self) -> &ExportEngine {
        &self.engine
    }

    pub fn uses_reference_data(&self) -> bool {
        self.reference.is_some()
    }

    pub async fn export(&self, request: &ExportRequest, sink: Arc<dyn ProgressSink>) -> ServiceResult<ExportSummary> {
        self.export_on(request, Local::now().date_naive(), sink).await
    }

    /// Same as [`export`](Self::export) with an explicit run date.
    pub async fn export_on(
        &self,
        request: &ExportRequest,
        run_date: NaiveDate,
        sink: Arc<dyn ProgressSink>,
    ) -> ServiceResult<ExportSummary> {
        log::info!(
            "Export requested: execution id {}, chain {}, {} records",
            request.execution_id,
            request.chain_code,
            request.record_count
        );
        let outcome = self.validator.validate(request).await;
        if !outcome.is_valid() {
            let errors = outcome.outcome.into_errors();
            GuardedProgressSink::new(Arc::clone(&sink)).error(&errors.join("\n"));
            return Err(ServiceError::Rejected(errors));
        }
        let validated = outcome
            .value
            .ok_or_else(|| DomainError::Internal("validated request missing".to_string()))?;

        let defaults = self.record_defaults(&validated, run_date).await;
        let resolver = self.sources.resolve_for(defaults, rand::random::<u64>()).await;
        let job = ExportJob {
            chain_code: validated.chain_code,
            chain: validated.chain,
            record_count: validated.record_count,
            output_dir: validated.output_dir,
            run_date,
        };
        Ok(self.engine.run(&job, &resolver, sink).await?)
    }

    async fn record_defaults(&self, request: &ValidatedRequest, run_date: NaiveDate) -> RecordDefaults {
        let mut defaults = RecordDefaults::new(
            &request.execution_id,
            &request.pid,
            &request.ndc,
            &request.reason_code,
            &run_date.format(FILE_DATE_FORMAT).to_string(),
        );
        if let Some(unit) = &request.unit_of_measure {
            defaults.alternate_uom = unit.clone();
        }
        if let Some(reference) = &self.reference {
            defaults.account_number = reference.first_account_number(&request.chain_code).await;
            let codes = reference.billing_codes(&request.ndc).await;
            defaults.credit_request_type = codes.credit_request_type;
            defaults.debit_request_type = codes.debit_request_type;
        }
        defaults
    }
}
