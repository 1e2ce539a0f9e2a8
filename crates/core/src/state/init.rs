use crate::error::{Result, WfdError};
use crate::protocol::message::{MessageId, Response, WFD_OPTION_TAG};
use crate::state::{Inbound, Phase, PhaseContext, PhaseKind, Progress};

/// Methods the sink accepts from the source, advertised in the M1 reply.
pub const SINK_PUBLIC_METHODS: &str = "org.wfa.wfd1.0, GET_PARAMETER, SET_PARAMETER";

/// Answers the source's opening OPTIONS (M1).
#[derive(Debug, Default)]
pub struct InitPhase;

impl Phase for InitPhase {
    fn kind(&self) -> PhaseKind {
        PhaseKind::Init
    }

    fn inbound(&self) -> &'static [MessageId] {
        &[MessageId::M1]
    }

    fn handle(&mut self, ctx: &mut PhaseContext<'_>, inbound: Inbound) -> Result<Progress> {
        let Inbound::Request(request) = inbound else {
            return Ok(Progress::Continue);
        };

        if !request.header.has_token("Require", WFD_OPTION_TAG) {
            tracing::warn!(cseq = request.header.cseq, "M1 without WFD Require tag");
            ctx.reply(
                Response::option_not_supported()
                    .answering(&request)
                    .add_header("Unsupported", request.header.get("Require").unwrap_or("")),
            );
            return Err(WfdError::MissingHeader {
                id: MessageId::M1,
                header: "Require",
            });
        }

        ctx.reply(
            Response::ok()
                .answering(&request)
                .add_header("Public", SINK_PUBLIC_METHODS),
        );
        Ok(Progress::Completed)
    }
}
