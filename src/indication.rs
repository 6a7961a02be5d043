//! The indication pipeline: decode a `RIC_INDICATION` frame's nested KPM
//! measurement containers and fold the results into per-UE and per-cell KV
//! records.
//!
//! Top-level decode failures (bad header, bad message, unknown format) abort
//! the whole frame and are returned to the caller to log; failures while
//! walking an individual nested item (bad C-RNTI, bad slice id, ...) are
//! logged and that one item is skipped, so the rest of the indication still
//! lands in the store. This mirrors the original's `continue`-heavy loop
//! structure (`spec.md` §4.F / §9).

use log::{debug, error, trace, warn};

use crate::codec::{
    E2apCodec, E2smKpmCodec, IndicationHeaderFormat1, PfContainer, PmContainer, RanContainer,
    RanContainerVariant,
};
use crate::error::{CodecError, KvStoreError};
use crate::kvstore::{self, KvStore};
use crate::model::{CellMetricsEntry, Timestamp, UeMetricsEntry};
use crate::transport::Frame;

/// Header-derived context the flag-gated cell rollup is compared against,
/// carried down into the per-container walk.
#[derive(Debug, Clone, Default)]
struct HeaderContext {
    cell_id: String,
    plmn_id: String,
    slice_id: i32,
    five_qi: i64,
}

/// Accumulates the handful of cell-level fields that a matching container
/// may contribute, across both the PF and RAN containers of one
/// `PmContainer`. Only written back to the cell record when `flag` ends up
/// set; `-1` / `None` mean "this container did not contribute this field".
#[derive(Debug, Default)]
struct CellRollup {
    flag: bool,
    timestamp_pdcp_bytes: Option<Timestamp>,
    pdcp_bytes_dl: i64,
    pdcp_bytes_ul: i64,
    timestamp_prb: Option<Timestamp>,
    avail_prb_dl: i64,
    avail_prb_ul: i64,
}

impl CellRollup {
    fn new() -> Self {
        CellRollup {
            pdcp_bytes_dl: -1,
            pdcp_bytes_ul: -1,
            avail_prb_dl: -1,
            avail_prb_ul: -1,
            ..Default::default()
        }
    }
}

/// Decodes and applies one `RIC_INDICATION` frame. Returns an error only for
/// failures that make the rest of the frame unusable; everything else is
/// logged internally.
pub fn handle_indication(
    frame: &Frame,
    e2ap: &dyn E2apCodec,
    e2sm: &dyn E2smKpmCodec,
    kv: &dyn KvStore,
) -> Result<(), CodecError> {
    let im = e2ap.get_indication_message(&frame.payload)?;
    debug!(
        "RIC Indication from {}: reqId={} funcId={} actionId={} indSn={}",
        frame.meid.ran_name, im.request_id, im.func_id, im.action_id, im.ind_sn
    );

    let header = e2sm.get_indication_header(&im.ind_header)?;
    let ctx = match &header.format1 {
        Some(f1) => header_context(f1, e2sm)?,
        None => {
            error!("unknown RIC Indication Header format: {}", header.ind_hdr_type);
            return Err(CodecError::BadFormat(format!(
                "unsupported indication header format {}",
                header.ind_hdr_type
            )));
        }
    };

    let body = e2sm.get_indication_message(&im.ind_message)?;
    let format1 = match &body.format1 {
        Some(f1) => f1,
        None => {
            error!("unknown RIC Indication Message format: {}", body.ind_msg_type);
            return Err(CodecError::BadFormat(format!(
                "unsupported indication message format {}",
                body.ind_msg_type
            )));
        }
    };

    for pm in &format1.pm_containers {
        if let Err(e) = process_pm_container(pm, &ctx, e2sm, kv) {
            warn!("skipping PM container for {}: {e}", ctx.cell_id);
        }
    }

    Ok(())
}

fn header_context(f1: &IndicationHeaderFormat1, e2sm: &dyn E2smKpmCodec) -> Result<HeaderContext, CodecError> {
    let cell_id = match &f1.nrcgi {
        Some(nrcgi) => e2sm.parse_nrcgi(nrcgi)?,
        None => String::new(),
    };
    let plmn_id = match &f1.plmn_id {
        Some(buf) => e2sm.parse_plmn_identity(buf)?,
        None => String::new(),
    };
    let slice_id = match &f1.slice_id {
        Some(slice) => e2sm.parse_slice_id(slice)?,
        None => -1,
    };
    Ok(HeaderContext {
        cell_id,
        plmn_id,
        slice_id,
        five_qi: f1.five_qi,
    })
}

fn process_pm_container(
    pm: &PmContainer,
    ctx: &HeaderContext,
    e2sm: &dyn E2smKpmCodec,
    kv: &dyn KvStore,
) -> Result<(), KvStoreError> {
    let mut rollup = CellRollup::new();

    if let Some(pf) = &pm.pf_container {
        process_pf_container(pf, ctx, e2sm, &mut rollup);
    }
    if let Some(ran) = &pm.ran_container {
        process_ran_container(ran, ctx, e2sm, kv, &mut rollup)?;
    }

    if rollup.flag {
        update_cell_rollup(ctx, kv, &rollup)?;
    }
    Ok(())
}

fn process_pf_container(pf: &PfContainer, ctx: &HeaderContext, e2sm: &dyn E2smKpmCodec, rollup: &mut CellRollup) {
    match pf {
        PfContainer::ODu(o) => {
            for report in &o.cell_resource_reports {
                let cell_id = match e2sm.parse_nrcgi(&report.nrcgi) {
                    Ok(id) => id,
                    Err(e) => {
                        warn!("failed to parse NRCGI in O-DU PF container: {e}");
                        continue;
                    }
                };
                if cell_id == ctx.cell_id {
                    rollup.flag = true;
                }
                if rollup.flag {
                    rollup.avail_prb_dl = report.total_avail_prb_dl;
                    rollup.avail_prb_ul = report.total_avail_prb_ul;
                }
                trace!(
                    "O-DU cell {cell_id}: availPRB dl={} ul={}, {} served PLMNs",
                    report.total_avail_prb_dl,
                    report.total_avail_prb_ul,
                    report.served_plmn_per_cells.len()
                );
                for served in &report.served_plmn_per_cells {
                    let plmn_id = match e2sm.parse_plmn_identity(&served.plmn_id) {
                        Ok(id) => id,
                        Err(e) => {
                            warn!("failed to parse PlmnID in O-DU served PLMN per cell: {e}");
                            continue;
                        }
                    };
                    if let Some(pm5gc) = &served.du_pm_5gc {
                        for slice in &pm5gc.slices {
                            for fqi in &slice.per_five_qi {
                                trace!(
                                    "O-DU PlmnID [{plmn_id}] 5QI [{}]: PRB usage dl={} ul={}",
                                    fqi.five_qi, fqi.prb_usage_dl, fqi.prb_usage_ul
                                );
                            }
                        }
                    }
                    if let Some(epc) = &served.du_pm_epc {
                        for qci in &epc.per_qci {
                            trace!(
                                "O-DU PlmnID [{plmn_id}] QCI [{}]: PRB usage dl={} ul={}",
                                qci.qci, qci.prb_usage_dl, qci.prb_usage_ul
                            );
                        }
                    }
                }
            }
        }
        PfContainer::OCuCp(o) => {
            trace!("O-CU-CP PF container: activeUes={}", o.number_of_active_ues);
        }
        PfContainer::OCuUp(o) => {
            for item in &o.items {
                for plmn in &item.plmns {
                    let plmn_id = match e2sm.parse_plmn_identity(&plmn.plmn_id) {
                        Ok(id) => id,
                        Err(e) => {
                            warn!("failed to parse PlmnID in O-CU-UP PF container: {e}");
                            continue;
                        }
                    };
                    if let Some(epc) = &plmn.cu_up_pm_epc {
                        for qci in &epc.per_qci {
                            let dl = qci
                                .pdcp_bytes_dl
                                .as_ref()
                                .and_then(|buf| e2sm.parse_integer(buf).ok());
                            let ul = qci
                                .pdcp_bytes_ul
                                .as_ref()
                                .and_then(|buf| e2sm.parse_integer(buf).ok());
                            trace!(
                                "O-CU-UP PlmnID [{plmn_id}] QCI [{}]: PDCP bytes dl={dl:?} ul={ul:?}",
                                qci.qci
                            );
                        }
                    }
                    let Some(pm5gc) = &plmn.cu_up_pm_5gc else { continue };
                    for slice_to_report in &pm5gc.slice_to_reports {
                        let slice_id = match e2sm.parse_slice_id(&slice_to_report.slice_id) {
                            Ok(id) => id,
                            Err(e) => {
                                warn!(
                                    "failed to parse sliceID in O-CU-UP PF container with PlmnID [{plmn_id}]: {e}"
                                );
                                continue;
                            }
                        };
                        for fqi in &slice_to_report.per_five_qi {
                            if plmn_id == ctx.plmn_id && slice_id == ctx.slice_id && fqi.five_qi == ctx.five_qi {
                                rollup.flag = true;
                            }
                            if !rollup.flag {
                                continue;
                            }
                            if let Some(buf) = &fqi.pdcp_bytes_dl {
                                match e2sm.parse_integer(buf) {
                                    Ok(v) => rollup.pdcp_bytes_dl = v as i64,
                                    Err(e) => warn!(
                                        "failed to parse PDCPBytesDL with PlmnID [{plmn_id}], sliceID [{slice_id}], 5QI [{}]: {e}",
                                        fqi.five_qi
                                    ),
                                }
                            }
                            if let Some(buf) = &fqi.pdcp_bytes_ul {
                                match e2sm.parse_integer(buf) {
                                    Ok(v) => rollup.pdcp_bytes_ul = v as i64,
                                    Err(e) => warn!(
                                        "failed to parse PDCPBytesUL with PlmnID [{plmn_id}], sliceID [{slice_id}], 5QI [{}]: {e}",
                                        fqi.five_qi
                                    ),
                                }
                            }
                        }
                    }
                }
            }
        }
        PfContainer::Unknown(tag) => {
            error!("unknown PF Container type: {tag}");
        }
    }
}

fn process_ran_container(
    ran: &RanContainer,
    ctx: &HeaderContext,
    e2sm: &dyn E2smKpmCodec,
    kv: &dyn KvStore,
    rollup: &mut CellRollup,
) -> Result<(), KvStoreError> {
    let timestamp = match e2sm.parse_timestamp(&ran.timestamp) {
        Ok(t) => t,
        Err(e) => {
            warn!("failed to parse RAN container timestamp: {e}");
            Timestamp::default()
        }
    };

    match &ran.variant {
        RanContainerVariant::Du(report) => {
            for cell in &report.cell_reports {
                let serving_cell_id = match e2sm.parse_nrcgi(&cell.nrcgi) {
                    Ok(id) => id,
                    Err(e) => {
                        warn!("failed to parse NRCGI in DU Usage Report: {e}");
                        continue;
                    }
                };
                for ue_item in &cell.ue_items {
                    let ue_id = match e2sm.parse_integer(&ue_item.crnti) {
                        Ok(id) => id,
                        Err(e) => {
                            warn!("failed to parse C-RNTI in DU Usage Report with serving cell [{serving_cell_id}]: {e}");
                            continue;
                        }
                    };
                    let key = ue_id.to_string();
                    let mut ue: UeMetricsEntry = kvstore::get_or_default(kv, &key)?;
                    ue.serving_cell_id = serving_cell_id.clone();
                    if rollup.flag {
                        rollup.timestamp_prb = Some(timestamp);
                    }
                    ue.meas_timestamp_prb = timestamp;
                    if ue_item.prb_usage_dl != -1 {
                        ue.prb_usage_dl = ue_item.prb_usage_dl;
                    }
                    if ue_item.prb_usage_ul != -1 {
                        ue.prb_usage_ul = ue_item.prb_usage_ul;
                    }
                    kvstore::put(kv, &key, &ue)?;
                }
            }
        }
        RanContainerVariant::CuCp(report) => {
            for cell in &report.cell_reports {
                let serving_cell_id = match e2sm.parse_nrcgi(&cell.nrcgi) {
                    Ok(id) => id,
                    Err(e) => {
                        warn!("failed to parse NRCGI in CU-CP Usage Report: {e}");
                        continue;
                    }
                };
                for ue_item in &cell.ue_items {
                    let ue_id = match e2sm.parse_integer(&ue_item.crnti) {
                        Ok(id) => id,
                        Err(e) => {
                            warn!("failed to parse C-RNTI in CU-CP Usage Report with serving cell [{serving_cell_id}]: {e}");
                            continue;
                        }
                    };
                    let key = ue_id.to_string();
                    let mut ue: UeMetricsEntry = kvstore::get_or_default(kv, &key)?;
                    ue.serving_cell_id = serving_cell_id.clone();
                    ue.meas_time_rf = timestamp;
                    if let Some(v) = &ue_item.serving_cell_rf {
                        ue.serving_cell_rf = Some(v.clone());
                    }
                    if let Some(v) = &ue_item.neighbor_cell_rf {
                        ue.neighbor_cells_rf = Some(v.clone());
                    }
                    kvstore::put(kv, &key, &ue)?;
                }
            }
        }
        RanContainerVariant::CuUp(report) => {
            for cell in &report.cell_reports {
                let serving_cell_id = match e2sm.parse_nrcgi(&cell.nrcgi) {
                    Ok(id) => id,
                    Err(e) => {
                        warn!("failed to parse NRCGI in CU-UP Usage Report: {e}");
                        continue;
                    }
                };
                for ue_item in &cell.ue_items {
                    let ue_id = match e2sm.parse_integer(&ue_item.crnti) {
                        Ok(id) => id,
                        Err(e) => {
                            warn!("failed to parse C-RNTI in CU-UP Usage Report with serving cell [{serving_cell_id}]: {e}");
                            continue;
                        }
                    };
                    let key = ue_id.to_string();
                    let mut ue: UeMetricsEntry = kvstore::get_or_default(kv, &key)?;
                    ue.serving_cell_id = serving_cell_id.clone();
                    if rollup.flag {
                        rollup.timestamp_pdcp_bytes = Some(timestamp);
                    }
                    ue.meas_timestamp_pdcp_bytes = timestamp;
                    if let Some(buf) = &ue_item.pdcp_bytes_dl {
                        match e2sm.parse_integer(buf) {
                            Ok(v) => ue.pdcp_bytes_dl = v as i64,
                            Err(e) => {
                                warn!("failed to parse PDCPBytesDL in CU-UP Usage Report with UE ID [{ue_id}]: {e}");
                                continue;
                            }
                        }
                    }
                    if let Some(buf) = &ue_item.pdcp_bytes_ul {
                        match e2sm.parse_integer(buf) {
                            Ok(v) => ue.pdcp_bytes_ul = v as i64,
                            Err(e) => {
                                warn!("failed to parse PDCPBytesUL in CU-UP Usage Report with UE ID [{ue_id}]: {e}");
                                continue;
                            }
                        }
                    }
                    kvstore::put(kv, &key, &ue)?;
                }
            }
        }
        RanContainerVariant::Unknown(tag) => {
            error!("unknown RAN Container type: {tag}");
        }
    }
    Ok(())
}

fn update_cell_rollup(ctx: &HeaderContext, kv: &dyn KvStore, rollup: &CellRollup) -> Result<(), KvStoreError> {
    let mut cell: CellMetricsEntry = kvstore::get_or_default(kv, &ctx.cell_id)?;
    if let Some(t) = rollup.timestamp_pdcp_bytes {
        cell.meas_timestamp_pdcp_bytes = t;
    }
    if rollup.pdcp_bytes_dl != -1 {
        cell.pdcp_bytes_dl = rollup.pdcp_bytes_dl;
    }
    if rollup.pdcp_bytes_ul != -1 {
        cell.pdcp_bytes_ul = rollup.pdcp_bytes_ul;
    }
    if let Some(t) = rollup.timestamp_prb {
        cell.meas_timestamp_prb = t;
    }
    if rollup.avail_prb_dl != -1 {
        cell.avail_prb_dl = rollup.avail_prb_dl;
    }
    if rollup.avail_prb_ul != -1 {
        cell.avail_prb_ul = rollup.avail_prb_ul;
    }
    kvstore::put(kv, &ctx.cell_id, &cell)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{
        CellResourceReport, CuUpCellResourceReportItem, CuUpPfContainer, CuUpPfContainerItem, CuUpPlmn,
        CuUpPm5Gc, CuUpUeResourceReportItem, CuUpUsageReport, DuCellResourceReportItem, DuUeResourceReportItem,
        DuUsageReport, FiveQiPerSlicePerPlmn, IndicationHeader, IndicationMessage, IndicationMessageBody,
        IndicationMessageFormat1, Nrcgi, ODuPfContainer, SliceId, SliceToReport, SubscriptionResponseMessage,
    };
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    struct MemKv {
        data: Mutex<HashMap<String, String>>,
    }
    impl MemKv {
        fn new() -> Self {
            MemKv { data: Mutex::new(HashMap::new()) }
        }
    }
    impl KvStore for MemKv {
        fn exists(&self, key: &str) -> Result<bool, KvStoreError> {
            Ok(self.data.lock().unwrap().contains_key(key))
        }
        fn get(&self, key: &str) -> Result<Option<String>, KvStoreError> {
            Ok(self.data.lock().unwrap().get(key).cloned())
        }
        fn set(&self, key: &str, value: &str, _ttl: Duration) -> Result<(), KvStoreError> {
            self.data.lock().unwrap().insert(key.to_owned(), value.to_owned());
            Ok(())
        }
        fn del(&self, key: &str) -> Result<(), KvStoreError> {
            self.data.lock().unwrap().remove(key);
            Ok(())
        }
    }

    struct FakeCodec;
    impl E2apCodec for FakeCodec {
        fn set_subscription_request_payload(
            &self,
            _p: &crate::codec::SubscriptionRequestParams,
        ) -> Result<Vec<u8>, CodecError> {
            unimplemented!()
        }
        fn set_subscription_delete_request_payload(
            &self,
            _p: &crate::codec::SubscriptionDeleteRequestParams,
        ) -> Result<Vec<u8>, CodecError> {
            unimplemented!()
        }
        fn get_indication_message(&self, _payload: &[u8]) -> Result<IndicationMessage, CodecError> {
            Ok(IndicationMessage {
                request_id: 1001,
                request_sequence_number: 1001,
                func_id: 0,
                action_id: 1,
                ind_sn: 1,
                ind_type: 0,
                ind_header: vec![],
                ind_message: vec![],
                call_process_id: vec![],
            })
        }
        fn get_subscription_response_message(
            &self,
            _payload: &[u8],
        ) -> Result<SubscriptionResponseMessage, CodecError> {
            unimplemented!()
        }
    }

    struct FakeKpm;
    impl E2smKpmCodec for FakeKpm {
        fn set_event_trigger_definition(&self, _period_ms: i64) -> Result<Vec<u8>, CodecError> {
            unimplemented!()
        }
        fn set_action_definition(&self, _style_type: i64) -> Result<Vec<u8>, CodecError> {
            unimplemented!()
        }
        fn get_indication_header(&self, _bytes: &[u8]) -> Result<IndicationHeader, CodecError> {
            Ok(IndicationHeader {
                ind_hdr_type: 1,
                format1: Some(IndicationHeaderFormat1 {
                    nrcgi: Some(Nrcgi { plmn_id: vec![0x00, 0xf1, 0x10], nr_cell_id: vec![0, 0, 0, 0, 16], nr_cell_id_bits_unused: 0 }),
                    plmn_id: Some(vec![0x00, 0xf1, 0x10]),
                    slice_id: None,
                    five_qi: -1,
                    qci: -1,
                }),
            })
        }
        fn get_indication_message(&self, _bytes: &[u8]) -> Result<IndicationMessageBody, CodecError> {
            Ok(IndicationMessageBody {
                ind_msg_type: 1,
                style_type: 4,
                format1: Some(IndicationMessageFormat1 { pm_containers: build_containers() }),
            })
        }
        fn parse_nrcgi(&self, nrcgi: &Nrcgi) -> Result<String, CodecError> {
            Ok(format!("cell-{:x?}-{:x?}", nrcgi.plmn_id, nrcgi.nr_cell_id))
        }
        fn parse_plmn_identity(&self, buf: &[u8]) -> Result<String, CodecError> {
            Ok(format!("{buf:x?}"))
        }
        fn parse_slice_id(&self, slice: &SliceId) -> Result<i32, CodecError> {
            Ok(slice.sst.first().copied().unwrap_or(0) as i32)
        }
        fn parse_timestamp(&self, _buf: &[u8]) -> Result<Timestamp, CodecError> {
            Ok(Timestamp::new(100, 200))
        }
        fn parse_integer(&self, buf: &[u8]) -> Result<u64, CodecError> {
            use byteorder::{BigEndian, ByteOrder};
            let mut padded = [0u8; 8];
            padded[8 - buf.len()..].copy_from_slice(buf);
            Ok(BigEndian::read_u64(&padded))
        }
    }

    fn test_nrcgi() -> Nrcgi {
        Nrcgi { plmn_id: vec![0x00, 0xf1, 0x10], nr_cell_id: vec![0, 0, 0, 0, 16], nr_cell_id_bits_unused: 0 }
    }

    fn build_containers() -> Vec<PmContainer> {
        vec![PmContainer {
            pf_container: Some(PfContainer::ODu(ODuPfContainer {
                cell_resource_reports: vec![CellResourceReport {
                    nrcgi: test_nrcgi(),
                    total_avail_prb_dl: 100,
                    total_avail_prb_ul: 50,
                    served_plmn_per_cells: vec![],
                }],
            })),
            ran_container: Some(RanContainer {
                timestamp: vec![0, 0, 0, 0],
                variant: RanContainerVariant::Du(DuUsageReport {
                    cell_reports: vec![DuCellResourceReportItem {
                        nrcgi: test_nrcgi(),
                        ue_items: vec![DuUeResourceReportItem { crnti: vec![0x04, 0x01], prb_usage_dl: 10, prb_usage_ul: 5 }],
                    }],
                }),
            }),
        }]
    }

    #[test]
    fn du_indication_updates_ue_and_rolls_up_cell() {
        let kv = MemKv::new();
        let frame = Frame { mtype: crate::transport::mtype::RIC_INDICATION, sub_id: 1, meid: crate::transport::Meid::for_ran("ran1"), payload: vec![] };
        handle_indication(&frame, &FakeCodec, &FakeKpm, &kv).unwrap();

        let ue_key = 1025.to_string(); // 0x0401 == 1025
        let ue: UeMetricsEntry = kvstore::get_or_default(&kv, &ue_key).unwrap();
        assert_eq!(ue.prb_usage_dl, 10);
        assert_eq!(ue.prb_usage_ul, 5);

        let cell_id = format!("cell-{:x?}-{:x?}", test_nrcgi().plmn_id, test_nrcgi().nr_cell_id);
        let cell: CellMetricsEntry = kvstore::get_or_default(&kv, &cell_id).unwrap();
        assert_eq!(cell.avail_prb_dl, 100);
        assert_eq!(cell.avail_prb_ul, 50);
    }

    #[test]
    fn cu_up_indication_merges_pdcp_bytes_into_existing_ue() {
        let kv = MemKv::new();
        kvstore::put(
            &kv,
            &1025.to_string(),
            &UeMetricsEntry { prb_usage_dl: 10, ..Default::default() },
        )
        .unwrap();

        let frame_payload = PmContainer {
            pf_container: Some(PfContainer::OCuUp(CuUpPfContainer {
                items: vec![CuUpPfContainerItem {
                    plmns: vec![CuUpPlmn {
                        plmn_id: vec![0x00, 0xf1, 0x10],
                        cu_up_pm_5gc: Some(CuUpPm5Gc {
                            slice_to_reports: vec![SliceToReport {
                                slice_id: SliceId { sst: vec![1], sd: None },
                                per_five_qi: vec![FiveQiPerSlicePerPlmn {
                                    five_qi: 9,
                                    pdcp_bytes_dl: Some(vec![0x00, 0x10]),
                                    pdcp_bytes_ul: Some(vec![0x00, 0x20]),
                                }],
                            }],
                        }),
                        cu_up_pm_epc: None,
                    }],
                }],
            })),
            ran_container: Some(RanContainer {
                timestamp: vec![0, 0, 0, 0],
                variant: RanContainerVariant::CuUp(CuUpUsageReport {
                    cell_reports: vec![CuUpCellResourceReportItem {
                        nrcgi: test_nrcgi(),
                        ue_items: vec![CuUpUeResourceReportItem {
                            crnti: vec![0x04, 0x01],
                            pdcp_bytes_dl: Some(vec![0x00, 0x30]),
                            pdcp_bytes_ul: Some(vec![0x00, 0x40]),
                        }],
                    }],
                }),
            }),
        };

        struct OneShotKpm;
        impl E2smKpmCodec for OneShotKpm {
            fn set_event_trigger_definition(&self, _: i64) -> Result<Vec<u8>, CodecError> {
                unimplemented!()
            }
            fn set_action_definition(&self, _: i64) -> Result<Vec<u8>, CodecError> {
                unimplemented!()
            }
            fn get_indication_header(&self, _: &[u8]) -> Result<IndicationHeader, CodecError> {
                Ok(IndicationHeader {
                    ind_hdr_type: 1,
                    format1: Some(IndicationHeaderFormat1 {
                        nrcgi: Some(test_nrcgi()),
                        plmn_id: Some(vec![0x00, 0xf1, 0x10]),
                        slice_id: Some(SliceId { sst: vec![1], sd: None }),
                        five_qi: 9,
                        qci: -1,
                    }),
                })
            }
            fn get_indication_message(&self, _: &[u8]) -> Result<IndicationMessageBody, CodecError> {
                Ok(IndicationMessageBody { ind_msg_type: 1, style_type: 4, format1: Some(IndicationMessageFormat1 { pm_containers: vec![frame_payload.clone()] }) })
            }
            fn parse_nrcgi(&self, nrcgi: &Nrcgi) -> Result<String, CodecError> {
                Ok(format!("cell-{:x?}-{:x?}", nrcgi.plmn_id, nrcgi.nr_cell_id))
            }
            fn parse_plmn_identity(&self, buf: &[u8]) -> Result<String, CodecError> {
                Ok(format!("{buf:x?}"))
            }
            fn parse_slice_id(&self, slice: &SliceId) -> Result<i32, CodecError> {
                Ok(slice.sst.first().copied().unwrap_or(0) as i32)
            }
            fn parse_timestamp(&self, _: &[u8]) -> Result<Timestamp, CodecError> {
                Ok(Timestamp::new(1, 2))
            }
            fn parse_integer(&self, buf: &[u8]) -> Result<u64, CodecError> {
                use byteorder::{BigEndian, ByteOrder};
                let mut padded = [0u8; 8];
                padded[8 - buf.len()..].copy_from_slice(buf);
                Ok(BigEndian::read_u64(&padded))
            }
        }

        let frame = Frame { mtype: crate::transport::mtype::RIC_INDICATION, sub_id: 1, meid: crate::transport::Meid::for_ran("ran1"), payload: vec![] };
        handle_indication(&frame, &FakeCodec, &OneShotKpm, &kv).unwrap();

        let ue: UeMetricsEntry = kvstore::get_or_default(&kv, &1025.to_string()).unwrap();
        assert_eq!(ue.prb_usage_dl, 10, "prior field must survive the merge");
        assert_eq!(ue.pdcp_bytes_dl, 0x30);
        assert_eq!(ue.pdcp_bytes_ul, 0x40);

        let cell: CellMetricsEntry = kvstore::get_or_default(&kv, &format!("cell-{:x?}-{:x?}", test_nrcgi().plmn_id, test_nrcgi().nr_cell_id)).unwrap();
        assert_eq!(cell.pdcp_bytes_dl, 0x10);
        assert_eq!(cell.pdcp_bytes_ul, 0x20);
    }

    /// A PF container that never matches the indication header's own cell
    /// (here: an O-CU-CP container, which never sets the rollup flag at
    /// all) must not produce a cell record.
    #[test]
    fn unrelated_pf_container_does_not_create_a_cell_record() {
        let kv = MemKv::new();

        struct OCuCpOnlyKpm;
        impl E2smKpmCodec for OCuCpOnlyKpm {
            fn set_event_trigger_definition(&self, _: i64) -> Result<Vec<u8>, CodecError> {
                unimplemented!()
            }
            fn set_action_definition(&self, _: i64) -> Result<Vec<u8>, CodecError> {
                unimplemented!()
            }
            fn get_indication_header(&self, _: &[u8]) -> Result<IndicationHeader, CodecError> {
                Ok(IndicationHeader {
                    ind_hdr_type: 1,
                    format1: Some(IndicationHeaderFormat1 {
                        nrcgi: Some(test_nrcgi()),
                        plmn_id: Some(vec![0x00, 0xf1, 0x10]),
                        slice_id: None,
                        five_qi: -1,
                        qci: -1,
                    }),
                })
            }
            fn get_indication_message(&self, _: &[u8]) -> Result<IndicationMessageBody, CodecError> {
                Ok(IndicationMessageBody {
                    ind_msg_type: 1,
                    style_type: 4,
                    format1: Some(IndicationMessageFormat1 {
                        pm_containers: vec![PmContainer {
                            pf_container: Some(PfContainer::OCuCp(crate::codec::OCuCpPfContainer {
                                number_of_active_ues: 3,
                            })),
                            ran_container: None,
                        }],
                    }),
                })
            }
            fn parse_nrcgi(&self, nrcgi: &Nrcgi) -> Result<String, CodecError> {
                Ok(format!("cell-{:x?}-{:x?}", nrcgi.plmn_id, nrcgi.nr_cell_id))
            }
            fn parse_plmn_identity(&self, buf: &[u8]) -> Result<String, CodecError> {
                Ok(format!("{buf:x?}"))
            }
            fn parse_slice_id(&self, slice: &SliceId) -> Result<i32, CodecError> {
                Ok(slice.sst.first().copied().unwrap_or(0) as i32)
            }
            fn parse_timestamp(&self, _: &[u8]) -> Result<Timestamp, CodecError> {
                Ok(Timestamp::new(1, 2))
            }
            fn parse_integer(&self, buf: &[u8]) -> Result<u64, CodecError> {
                use byteorder::{BigEndian, ByteOrder};
                let mut padded = [0u8; 8];
                padded[8 - buf.len()..].copy_from_slice(buf);
                Ok(BigEndian::read_u64(&padded))
            }
        }

        let frame = Frame { mtype: crate::transport::mtype::RIC_INDICATION, sub_id: 1, meid: crate::transport::Meid::for_ran("ran1"), payload: vec![] };
        handle_indication(&frame, &FakeCodec, &OCuCpOnlyKpm, &kv).unwrap();

        let cell_id = format!("cell-{:x?}-{:x?}", test_nrcgi().plmn_id, test_nrcgi().nr_cell_id);
        assert!(!kv.exists(&cell_id).unwrap());
    }
}
