//! The E2AP / E2SM-KPM codec boundary.
//!
//! The wire encoding itself is out of scope (`spec.md` §1); this module only
//! fixes the *shape* the decoded values take once a concrete codec has done
//! its job, so that the indication pipeline and subscription controller can
//! be written against a stable, already-structured representation. Variants
//! are modelled as closed sum types keyed by their explicit `ContainerType` /
//! format tag, per the "tagged variants over dynamic dispatch" design note
//! (`spec.md` §9) — never inferred from Rust's own type identity.

use crate::model::Timestamp;

/// PLMN identity, carried as its raw BCD-style byte buffer until a codec
/// call turns it into a canonical string (`parse_plmn_identity`).
pub type PlmnIdBuf = Vec<u8>;

/// NR Cell Global Identifier: PLMN + cell id bit string, pre-canonicalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nrcgi {
    pub plmn_id: PlmnIdBuf,
    pub nr_cell_id: Vec<u8>,
    pub nr_cell_id_bits_unused: u8,
}

/// S-NSSAI slice selector, pre-canonicalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceId {
    pub sst: Vec<u8>,
    pub sd: Option<Vec<u8>>,
}

// ---------------------------------------------------------------------
// RIC Indication message (E2AP layer)
// ---------------------------------------------------------------------

/// The E2AP-layer envelope of a `RIC_INDICATION` frame, as decoded by
/// [`E2apCodec::get_indication_message`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicationMessage {
    pub request_id: i64,
    pub request_sequence_number: i64,
    pub func_id: i64,
    pub action_id: i64,
    pub ind_sn: i64,
    pub ind_type: i64,
    pub ind_header: Vec<u8>,
    pub ind_message: Vec<u8>,
    pub call_process_id: Vec<u8>,
}

/// Decoded `RIC_SUB_RESP` payload, log-only in this core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionResponseMessage {
    pub request_id: i64,
    pub request_sequence_number: i64,
    pub func_id: i64,
    pub action_admitted: Vec<i64>,
    pub action_not_admitted: Vec<(i64, Cause)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cause {
    pub cause_type: i32,
    pub cause_id: i32,
}

// ---------------------------------------------------------------------
// RIC Indication Header (E2SM-KPM layer) — only Format 1 is handled
// ---------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicationHeader {
    pub ind_hdr_type: i32,
    pub format1: Option<IndicationHeaderFormat1>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IndicationHeaderFormat1 {
    pub nrcgi: Option<Nrcgi>,
    pub plmn_id: Option<PlmnIdBuf>,
    pub slice_id: Option<SliceId>,
    /// -1 if not reported, as the wire format carries it.
    pub five_qi: i64,
    pub qci: i64,
}

// ---------------------------------------------------------------------
// RIC Indication Message (E2SM-KPM layer) — only Format 1 is handled
// ---------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicationMessageBody {
    pub ind_msg_type: i32,
    pub style_type: i64,
    pub format1: Option<IndicationMessageFormat1>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicationMessageFormat1 {
    pub pm_containers: Vec<PmContainer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PmContainer {
    pub pf_container: Option<PfContainer>,
    pub ran_container: Option<RanContainer>,
}

/// Performance-measurement container, tagged by `ContainerType`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PfContainer {
    /// Type 1 — O-DU.
    ODu(ODuPfContainer),
    /// Type 2 — O-CU-CP.
    OCuCp(OCuCpPfContainer),
    /// Type 3 — O-CU-UP.
    OCuUp(OCuUpPfContainer),
    /// Any other `ContainerType`; decoded far enough to report the tag and
    /// nothing else.
    Unknown(i32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ODuPfContainer {
    pub cell_resource_reports: Vec<CellResourceReport>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellResourceReport {
    pub nrcgi: Nrcgi,
    /// -1 if not reported.
    pub total_avail_prb_dl: i64,
    pub total_avail_prb_ul: i64,
    pub served_plmn_per_cells: Vec<ServedPlmnPerCell>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServedPlmnPerCell {
    pub plmn_id: PlmnIdBuf,
    pub du_pm_5gc: Option<DuPm5Gc>,
    pub du_pm_epc: Option<DuPmEpc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuPm5Gc {
    pub slices: Vec<SlicePerPlmnPerCell>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlicePerPlmnPerCell {
    pub slice_id: SliceId,
    pub per_five_qi: Vec<FiveQiPerSlicePerPlmnPerCell>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiveQiPerSlicePerPlmnPerCell {
    pub five_qi: i64,
    pub prb_usage_dl: i64,
    pub prb_usage_ul: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuPmEpc {
    pub per_qci: Vec<PerQciReport>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerQciReport {
    pub qci: i64,
    pub prb_usage_dl: i64,
    pub prb_usage_ul: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OCuCpPfContainer {
    pub number_of_active_ues: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OCuUpPfContainer {
    pub items: Vec<CuUpPfContainerItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CuUpPfContainerItem {
    pub plmns: Vec<CuUpPlmn>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CuUpPlmn {
    pub plmn_id: PlmnIdBuf,
    pub cu_up_pm_5gc: Option<CuUpPm5Gc>,
    pub cu_up_pm_epc: Option<CuUpPmEpc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CuUpPm5Gc {
    pub slice_to_reports: Vec<SliceToReport>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SliceToReport {
    pub slice_id: SliceId,
    pub per_five_qi: Vec<FiveQiPerSlicePerPlmn>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiveQiPerSlicePerPlmn {
    pub five_qi: i64,
    pub pdcp_bytes_dl: Option<Vec<u8>>,
    pub pdcp_bytes_ul: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CuUpPmEpc {
    pub per_qci: Vec<CuUpPerQciReport>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CuUpPerQciReport {
    pub qci: i64,
    pub pdcp_bytes_dl: Option<Vec<u8>>,
    pub pdcp_bytes_ul: Option<Vec<u8>>,
}

/// Per-UE RAN usage-report container, tagged by its own `ContainerType`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RanContainer {
    pub timestamp: Vec<u8>,
    pub variant: RanContainerVariant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RanContainerVariant {
    /// Type 1 — DU Usage Report.
    Du(DuUsageReport),
    /// Type 2 — CU-CP Usage Report.
    CuCp(CuCpUsageReport),
    /// Type 6 — CU-UP Usage Report.
    CuUp(CuUpUsageReport),
    Unknown(i32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuUsageReport {
    pub cell_reports: Vec<DuCellResourceReportItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuCellResourceReportItem {
    pub nrcgi: Nrcgi,
    pub ue_items: Vec<DuUeResourceReportItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuUeResourceReportItem {
    pub crnti: Vec<u8>,
    /// -1 if not reported.
    pub prb_usage_dl: i64,
    pub prb_usage_ul: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CuCpUsageReport {
    pub cell_reports: Vec<CuCpCellResourceReportItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CuCpCellResourceReportItem {
    pub nrcgi: Nrcgi,
    pub ue_items: Vec<CuCpUeResourceReportItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CuCpUeResourceReportItem {
    pub crnti: Vec<u8>,
    pub serving_cell_rf: Option<serde_json::Value>,
    pub neighbor_cell_rf: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CuUpUsageReport {
    pub cell_reports: Vec<CuUpCellResourceReportItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CuUpCellResourceReportItem {
    pub nrcgi: Nrcgi,
    pub ue_items: Vec<CuUpUeResourceReportItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CuUpUeResourceReportItem {
    pub crnti: Vec<u8>,
    pub pdcp_bytes_dl: Option<Vec<u8>>,
    pub pdcp_bytes_ul: Option<Vec<u8>>,
}

// ---------------------------------------------------------------------
// Subscription request construction inputs
// ---------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionDefinitionEntry {
    pub ric_style_type: i64,
    pub action_id: i64,
    pub action_type: i64,
    /// Empty when `ric_style_type == 0`, per `spec.md` §6 defaults.
    pub definition: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SubsequentAction {
    pub subsequent_action_type: i64,
    pub time_to_wait: i64,
    pub ric_action_type: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionRequestParams {
    pub request_id: i64,
    pub request_sequence_number: i64,
    pub func_id: i64,
    pub event_trigger_definition: Vec<u8>,
    pub actions: Vec<ActionDefinitionEntry>,
    pub subsequent_actions: Vec<SubsequentAction>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionDeleteRequestParams {
    pub request_id: i64,
    pub request_sequence_number: i64,
    pub func_id: i64,
}

use crate::error::CodecError;

/// E2AP-layer operations. See `spec.md` §6.
pub trait E2apCodec: Send + Sync {
    fn set_subscription_request_payload(
        &self,
        params: &SubscriptionRequestParams,
    ) -> Result<Vec<u8>, CodecError>;

    fn set_subscription_delete_request_payload(
        &self,
        params: &SubscriptionDeleteRequestParams,
    ) -> Result<Vec<u8>, CodecError>;

    fn get_indication_message(&self, payload: &[u8]) -> Result<IndicationMessage, CodecError>;

    fn get_subscription_response_message(
        &self,
        payload: &[u8],
    ) -> Result<SubscriptionResponseMessage, CodecError>;
}

/// E2SM-KPM-layer operations. See `spec.md` §6.
pub trait E2smKpmCodec: Send + Sync {
    fn set_event_trigger_definition(&self, period_ms: i64) -> Result<Vec<u8>, CodecError>;
    fn set_action_definition(&self, style_type: i64) -> Result<Vec<u8>, CodecError>;

    fn get_indication_header(&self, bytes: &[u8]) -> Result<IndicationHeader, CodecError>;
    fn get_indication_message(&self, bytes: &[u8]) -> Result<IndicationMessageBody, CodecError>;

    fn parse_nrcgi(&self, nrcgi: &Nrcgi) -> Result<String, CodecError>;
    fn parse_plmn_identity(&self, buf: &[u8]) -> Result<String, CodecError>;
    fn parse_slice_id(&self, slice: &SliceId) -> Result<i32, CodecError>;
    fn parse_timestamp(&self, buf: &[u8]) -> Result<Timestamp, CodecError>;
    /// Big-endian unsigned integer, width given by `buf.len()` bytes.
    fn parse_integer(&self, buf: &[u8]) -> Result<u64, CodecError>;
}
