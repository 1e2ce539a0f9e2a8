use crate::error::{Result, WfdError};
use crate::protocol::capabilities::answer_query;
use crate::protocol::message::{MessageId, Method, Request, Response, WFD_OPTION_TAG};
use crate::state::{Inbound, Phase, PhaseContext, PhaseKind, Progress};

/// Methods the source must advertise in its M2 reply.
const SOURCE_REQUIRED_METHODS: [&str; 7] = [
    WFD_OPTION_TAG,
    "GET_PARAMETER",
    "SET_PARAMETER",
    "SETUP",
    "PLAY",
    "PAUSE",
    "TEARDOWN",
];

/// Sink's OPTIONS (M2) followed by the source's capability queries (M3).
///
/// Never completes on its own: the source may query as often as it likes
/// and the phase gives way once the first M4/M5 arrives.
#[derive(Debug, Default)]
pub struct CapabilityNegotiation {
    options_acknowledged: bool,
    queries_answered: usize,
}

impl CapabilityNegotiation {
    fn check_options_reply(&mut self, response: &Response) -> Result<()> {
        if !response.is_ok() {
            return Err(WfdError::Rejected {
                id: MessageId::M2,
                status: response.status,
            });
        }
        if let Some(missing) = SOURCE_REQUIRED_METHODS
            .iter()
            .find(|method| !response.header.has_token("Public", method))
        {
            tracing::warn!(missing = *missing, "source does not support a required method");
            return Err(WfdError::MissingHeader {
                id: MessageId::M2,
                header: "Public",
            });
        }
        self.options_acknowledged = true;
        Ok(())
    }
}

impl Phase for CapabilityNegotiation {
    fn kind(&self) -> PhaseKind {
        PhaseKind::CapabilityNegotiation
    }

    fn inbound(&self) -> &'static [MessageId] {
        &[MessageId::M3]
    }

    fn outbound(&self) -> &'static [MessageId] {
        &[MessageId::M2]
    }

    fn start(&mut self, ctx: &mut PhaseContext<'_>) -> Result<Progress> {
        ctx.issue(
            Request::new(Method::Options, "*")
                .with_id(MessageId::M2)
                .add_header("Require", WFD_OPTION_TAG),
        );
        Ok(Progress::Continue)
    }

    fn handle(&mut self, ctx: &mut PhaseContext<'_>, inbound: Inbound) -> Result<Progress> {
        match inbound {
            Inbound::Reply(_, response) => self.check_options_reply(&response)?,
            Inbound::Request(request) => {
                let media = ctx.media()?;
                let answer = answer_query(
                    &media.capabilities(),
                    media.rtp_ports(),
                    request.payload.parameters(),
                );
                ctx.reply(Response::ok().answering(&request).with_payload(answer));
                self.queries_answered += 1;
            }
        }
        Ok(Progress::Continue)
    }

    fn is_settled(&self) -> bool {
        self.options_acknowledged && self.queries_answered > 0
    }
}
