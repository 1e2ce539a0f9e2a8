use crate::error::{Result, WfdError};
use crate::media::SelectedFormats;
use crate::protocol::message::{MessageId, Method, Request, Response};
use crate::protocol::payload::{
    TriggerMethod, WFD_AUDIO_CODECS, WFD_PRESENTATION_URL, WFD_TRIGGER_METHOD, WFD_VIDEO_FORMATS,
};
use crate::state::{Inbound, Phase, PhaseContext, PhaseKind, Progress};
use crate::timer::KeepAliveTimer;

/// Source's parameter set (M4) and SETUP trigger (M5), answered by the
/// sink's SETUP (M6).
///
/// Completes once the SETUP reply hands us a session id; the keep-alive
/// timer is armed at that point and handed over to streaming.
#[derive(Debug)]
pub struct SessionEstablishment {
    keep_alive: KeepAliveTimer,
}

impl SessionEstablishment {
    pub fn new(keep_alive: KeepAliveTimer) -> Self {
        Self { keep_alive }
    }

    fn on_trigger(&mut self, ctx: &mut PhaseContext<'_>, request: &Request) -> Result<Progress> {
        match read_trigger(ctx, request, PhaseKind::SessionEstablishment)? {
            TriggerMethod::Setup => {}
            other => {
                ctx.reply(Response::bad_request().answering(request));
                return Err(WfdError::UnexpectedTrigger {
                    method: other.to_string(),
                    phase: PhaseKind::SessionEstablishment.as_str(),
                });
            }
        }

        let media = ctx.media()?;
        let url = media.presentation_url();
        if url.is_empty() {
            ctx.reply(Response::bad_request().answering(request));
            return Err(WfdError::MissingProperty {
                id: MessageId::M5,
                property: WFD_PRESENTATION_URL,
            });
        }

        ctx.reply(Response::ok().answering(request));
        ctx.issue(
            Request::new(Method::Setup, &url)
                .with_id(MessageId::M6)
                .add_header("Transport", &transport(media.rtp_ports())),
        );
        Ok(Progress::Continue)
    }

    fn on_setup_reply(
        &mut self,
        ctx: &mut PhaseContext<'_>,
        response: &Response,
    ) -> Result<Progress> {
        if !response.is_ok() {
            return Err(WfdError::Rejected {
                id: MessageId::M6,
                status: response.status,
            });
        }
        let session = response
            .header
            .session
            .as_deref()
            .ok_or(WfdError::MissingSession)?;

        ctx.media()?.set_session(session);

        let config = ctx.config();
        let timeout = response
            .header
            .session_timeout
            .unwrap_or(config.default_session_timeout_secs)
            .min(config.max_session_timeout_secs);
        let seconds = timeout.saturating_add(config.keep_alive_grace_secs);
        self.keep_alive.arm(ctx.timers(), seconds);

        tracing::info!(session, timeout, "session established");
        Ok(Progress::Completed)
    }
}

impl Phase for SessionEstablishment {
    fn kind(&self) -> PhaseKind {
        PhaseKind::SessionEstablishment
    }

    fn inbound(&self) -> &'static [MessageId] {
        &[MessageId::M4, MessageId::M5]
    }

    fn outbound(&self) -> &'static [MessageId] {
        &[MessageId::M6]
    }

    fn handle(&mut self, ctx: &mut PhaseContext<'_>, inbound: Inbound) -> Result<Progress> {
        match inbound {
            Inbound::Request(request) if request.id == MessageId::M4 => {
                apply_parameters(ctx, &request)?;
                Ok(Progress::Continue)
            }
            Inbound::Request(request) => self.on_trigger(ctx, &request),
            Inbound::Reply(_, response) => self.on_setup_reply(ctx, &response),
        }
    }

    fn handle_timeout(
        &mut self,
        _ctx: &mut PhaseContext<'_>,
        timer_id: u32,
    ) -> Option<Result<Progress>> {
        self.keep_alive
            .is(timer_id)
            .then_some(Err(WfdError::KeepAliveExpired))
    }
}

/// Apply an M4 parameter set: store the presentation URL and hand the
/// selected formats to the media manager. Answers the request either way.
pub(super) fn apply_parameters(ctx: &mut PhaseContext<'_>, request: &Request) -> Result<()> {
    let media = ctx.media()?;
    let payload = &request.payload;

    if let Some(url) = payload.presentation_url() {
        tracing::debug!(url, "presentation URL set");
        media.set_presentation_url(url);
    }

    let formats = SelectedFormats {
        video: payload.property(WFD_VIDEO_FORMATS).map(str::to_string),
        audio: payload.property(WFD_AUDIO_CODECS).map(str::to_string),
    };
    if !formats.is_empty() && !media.select_formats(&formats) {
        tracing::warn!(?formats, "selected formats refused");
        ctx.reply(Response::see_other().answering(request));
        return Err(WfdError::FormatRejected);
    }

    ctx.reply(Response::ok().answering(request));
    Ok(())
}

/// Read `wfd_trigger_method` from an M5 request, answering 400 when it is
/// absent or unknown.
pub(super) fn read_trigger(
    ctx: &mut PhaseContext<'_>,
    request: &Request,
    phase: PhaseKind,
) -> Result<TriggerMethod> {
    if let Some(trigger) = request.payload.trigger_method() {
        tracing::debug!(%trigger, %phase, "trigger received");
        return Ok(trigger);
    }
    ctx.reply(Response::bad_request().answering(request));
    match request.payload.property(WFD_TRIGGER_METHOD) {
        Some(value) => Err(WfdError::UnexpectedTrigger {
            method: value.to_string(),
            phase: phase.as_str(),
        }),
        None => Err(WfdError::MissingProperty {
            id: MessageId::M5,
            property: WFD_TRIGGER_METHOD,
        }),
    }
}

/// `Transport` header of the SETUP request for the local RTP ports.
fn transport((rtp0, rtp1): (u16, u16)) -> String {
    match rtp1 {
        0 => format!("RTP/AVP/UDP;unicast;client_port={}", rtp0),
        _ => format!("RTP/AVP/UDP;unicast;client_port={}-{}", rtp0, rtp1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::message::Message;
    use crate::state::testing::{Harness, request};

    const URL: &str = "rtsp://192.168.173.1/wfd1.0/streamid=0";

    fn m4(cseq: u32) -> Request {
        request(
            Method::SetParameter,
            MessageId::M4,
            cseq,
            &format!(
                "wfd_video_formats: 00 00 02 10 00000001 00000000 00000000 00 0000 0000 00 none none\r\n\
                 wfd_audio_codecs: AAC 00000001 00\r\n\
                 wfd_presentation_URL: {} none\r\n",
                URL
            ),
        )
    }

    fn m5(cseq: u32, trigger: &str) -> Request {
        request(
            Method::SetParameter,
            MessageId::M5,
            cseq,
            &format!("wfd_trigger_method: {}\r\n", trigger),
        )
    }

    fn setup_reply(session: Option<&str>) -> Inbound {
        let mut response = Response::ok();
        response.header.session = session.map(str::to_string);
        response.header.session_timeout = Some(30);
        Inbound::Reply(MessageId::M6, response)
    }

    #[test]
    fn parameters_stored_on_media() {
        let mut harness = Harness::new();
        let mut phase = SessionEstablishment::new(KeepAliveTimer::new());
        let progress = harness
            .run(|ctx| phase.handle(ctx, Inbound::Request(m4(3))))
            .unwrap();
        assert_eq!(progress, Progress::Continue);

        let media = harness.media.state.lock();
        assert_eq!(media.url, URL);
        assert_eq!(media.formats.len(), 1);
        assert_eq!(media.formats[0].audio.as_deref(), Some("AAC 00000001 00"));
        drop(media);

        let outbox = harness.take_outbox();
        let [Message::Response(reply)] = outbox.as_slice() else {
            panic!("expected a single reply");
        };
        assert!(reply.is_ok());
        assert_eq!(reply.header.cseq, 3);
    }

    #[test]
    fn refused_formats_answer_see_other() {
        let mut harness = Harness::new();
        harness.media.state.lock().reject_formats = true;
        let mut phase = SessionEstablishment::new(KeepAliveTimer::new());
        let result = harness.run(|ctx| phase.handle(ctx, Inbound::Request(m4(3))));
        assert!(matches!(result, Err(WfdError::FormatRejected)));

        let outbox = harness.take_outbox();
        let [Message::Response(reply)] = outbox.as_slice() else {
            panic!("expected a single reply");
        };
        assert_eq!(reply.status, 303);
    }

    #[test]
    fn setup_trigger_issues_setup_with_transport() {
        let mut harness = Harness::new();
        harness.cseq = 2;
        let mut phase = SessionEstablishment::new(KeepAliveTimer::new());
        harness.run(|ctx| phase.handle(ctx, Inbound::Request(m4(3)))).unwrap();
        harness.take_outbox();

        harness
            .run(|ctx| phase.handle(ctx, Inbound::Request(m5(4, "SETUP"))))
            .unwrap();
        let outbox = harness.take_outbox();
        let [Message::Response(ack), Message::Request(m6)] = outbox.as_slice() else {
            panic!("expected reply then SETUP");
        };
        assert!(ack.is_ok());
        assert_eq!(m6.id, MessageId::M6);
        assert_eq!(m6.method, Method::Setup);
        assert_eq!(m6.uri, URL);
        assert_eq!(m6.header.cseq, 2);
        assert_eq!(
            m6.header.get("Transport"),
            Some("RTP/AVP/UDP;unicast;client_port=19000")
        );
    }

    #[test]
    fn setup_trigger_without_url_fails() {
        let mut harness = Harness::new();
        let mut phase = SessionEstablishment::new(KeepAliveTimer::new());
        let result = harness.run(|ctx| phase.handle(ctx, Inbound::Request(m5(4, "SETUP"))));
        assert!(matches!(
            result,
            Err(WfdError::MissingProperty {
                id: MessageId::M5,
                ..
            })
        ));
        assert!(harness.outstanding.is_empty());
    }

    #[test]
    fn play_trigger_is_unexpected_here() {
        let mut harness = Harness::new();
        let mut phase = SessionEstablishment::new(KeepAliveTimer::new());
        let result = harness.run(|ctx| phase.handle(ctx, Inbound::Request(m5(4, "PLAY"))));
        assert!(matches!(result, Err(WfdError::UnexpectedTrigger { .. })));
    }

    #[test]
    fn setup_reply_establishes_session_and_arms_keep_alive() {
        let mut harness = Harness::new();
        let keep_alive = KeepAliveTimer::new();
        let mut phase = SessionEstablishment::new(keep_alive.clone());

        let progress = harness
            .run(|ctx| phase.handle(ctx, setup_reply(Some("6B8B4567"))))
            .unwrap();
        assert_eq!(progress, Progress::Completed);
        assert_eq!(harness.media.state.lock().session, "6B8B4567");

        let timer = keep_alive.current().expect("keep-alive armed");
        assert!(harness.delegate.created.lock().contains(&(timer, 35)));

        let expired = harness.run(|ctx| phase.handle_timeout(ctx, timer));
        assert!(matches!(expired, Some(Err(WfdError::KeepAliveExpired))));
        assert!(harness.run(|ctx| phase.handle_timeout(ctx, timer + 1)).is_none());
    }

    #[test]
    fn oversized_session_timeout_is_clamped() {
        let mut harness = Harness::new();
        let keep_alive = KeepAliveTimer::new();
        let mut phase = SessionEstablishment::new(keep_alive.clone());

        let mut response = Response::ok();
        response.header.session = Some("6B8B4567".to_string());
        response.header.session_timeout = Some(u32::MAX);
        let progress = harness
            .run(|ctx| phase.handle(ctx, Inbound::Reply(MessageId::M6, response)))
            .unwrap();
        assert_eq!(progress, Progress::Completed);

        let timer = keep_alive.current().unwrap();
        let expected =
            harness.config.max_session_timeout_secs + harness.config.keep_alive_grace_secs;
        assert!(harness.delegate.created.lock().contains(&(timer, expected)));
    }

    #[test]
    fn setup_reply_without_session_fails() {
        let mut harness = Harness::new();
        let mut phase = SessionEstablishment::new(KeepAliveTimer::new());
        let result = harness.run(|ctx| phase.handle(ctx, setup_reply(None)));
        assert!(matches!(result, Err(WfdError::MissingSession)));
    }

    #[test]
    fn transport_lists_both_ports_when_present() {
        assert_eq!(
            transport((1028, 1029)),
            "RTP/AVP/UDP;unicast;client_port=1028-1029"
        );
    }
}
