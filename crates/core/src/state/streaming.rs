use crate::error::{Result, WfdError};
use crate::protocol::message::{MessageId, Method, Request, Response};
use crate::protocol::payload::TriggerMethod;
use crate::state::establishment::{apply_parameters, read_trigger};
use crate::state::{Inbound, Phase, PhaseContext, PhaseKind, Progress};
use crate::timer::KeepAliveTimer;

/// Established session: playback control and keep-alive.
///
/// Playback requests (M7 PLAY, M9 PAUSE, M8 TEARDOWN) come either from the
/// application or from a source trigger (M5). Media is only started or
/// paused once the source confirms; a confirmed TEARDOWN ends the session.
#[derive(Debug)]
pub struct Streaming {
    keep_alive: KeepAliveTimer,
}

impl Streaming {
    pub fn new(keep_alive: KeepAliveTimer) -> Self {
        Self { keep_alive }
    }

    fn on_trigger(&mut self, ctx: &mut PhaseContext<'_>, request: &Request) -> Result<()> {
        let (method, id) = match read_trigger(ctx, request, PhaseKind::Streaming)? {
            TriggerMethod::Play => (Method::Play, MessageId::M7),
            TriggerMethod::Pause => (Method::Pause, MessageId::M9),
            TriggerMethod::Teardown => (Method::Teardown, MessageId::M8),
            TriggerMethod::Setup => {
                ctx.reply(Response::bad_request().answering(request));
                return Err(WfdError::UnexpectedTrigger {
                    method: TriggerMethod::Setup.to_string(),
                    phase: PhaseKind::Streaming.as_str(),
                });
            }
        };
        ctx.reply(Response::ok().answering(request));
        issue_command(ctx, method, id)
    }

    fn on_keep_alive(&mut self, ctx: &mut PhaseContext<'_>, request: &Request) -> Result<()> {
        let mut reply = Response::ok().answering(request);
        if reply.header.session.is_none() {
            reply.header.session = Some(ctx.media()?.session());
        }
        ctx.reply(reply);

        if self.keep_alive.rearm(ctx.timers()).is_none() {
            tracing::warn!("keep-alive before the timer was ever armed");
        }
        Ok(())
    }

    fn on_reply(
        &mut self,
        ctx: &mut PhaseContext<'_>,
        id: MessageId,
        response: &Response,
    ) -> Result<Progress> {
        if !response.is_ok() {
            return Err(WfdError::Rejected {
                id,
                status: response.status,
            });
        }
        match id {
            MessageId::M7 => {
                tracing::info!("playback started");
                ctx.media()?.play();
            }
            MessageId::M9 => {
                tracing::info!("playback paused");
                ctx.media()?.pause();
            }
            MessageId::M8 => {
                tracing::info!("session torn down by source");
                return Ok(Progress::Completed);
            }
            _ => {}
        }
        Ok(Progress::Continue)
    }
}

impl Phase for Streaming {
    fn kind(&self) -> PhaseKind {
        PhaseKind::Streaming
    }

    fn inbound(&self) -> &'static [MessageId] {
        &[MessageId::M4, MessageId::M5, MessageId::M16]
    }

    fn outbound(&self) -> &'static [MessageId] {
        &[MessageId::M7, MessageId::M8, MessageId::M9]
    }

    fn start(&mut self, ctx: &mut PhaseContext<'_>) -> Result<Progress> {
        if ctx.config().auto_play {
            issue_command(ctx, Method::Play, MessageId::M7)?;
        }
        Ok(Progress::Continue)
    }

    fn handle(&mut self, ctx: &mut PhaseContext<'_>, inbound: Inbound) -> Result<Progress> {
        match inbound {
            Inbound::Request(request) => {
                match request.id {
                    MessageId::M4 => apply_parameters(ctx, &request)?,
                    MessageId::M5 => self.on_trigger(ctx, &request)?,
                    _ => self.on_keep_alive(ctx, &request)?,
                }
                Ok(Progress::Continue)
            }
            Inbound::Reply(id, response) => self.on_reply(ctx, id, &response),
        }
    }

    fn handle_timeout(
        &mut self,
        _ctx: &mut PhaseContext<'_>,
        timer_id: u32,
    ) -> Option<Result<Progress>> {
        if !self.keep_alive.is(timer_id) {
            return None;
        }
        tracing::warn!(timer_id, "source stopped sending keep-alives");
        Some(Err(WfdError::KeepAliveExpired))
    }
}

fn issue_command(ctx: &mut PhaseContext<'_>, method: Method, id: MessageId) -> Result<()> {
    let media = ctx.media()?;
    ctx.issue(Request::command(
        method,
        id,
        &media.presentation_url(),
        &media.session(),
    ));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::message::Message;
    use crate::state::testing::{Harness, request};

    const URL: &str = "rtsp://192.168.173.1/wfd1.0/streamid=0";

    fn established() -> (Harness, KeepAliveTimer) {
        let mut harness = Harness::new();
        {
            let mut media = harness.media.state.lock();
            media.url = URL.to_string();
            media.session = "6B8B4567".to_string();
        }
        let keep_alive = KeepAliveTimer::new();
        keep_alive.arm(&mut harness.timers, 65);
        (harness, keep_alive)
    }

    fn trigger(cseq: u32, method: &str) -> Inbound {
        Inbound::Request(request(
            Method::SetParameter,
            MessageId::M5,
            cseq,
            &format!("wfd_trigger_method: {}\r\n", method),
        ))
    }

    #[test]
    fn auto_play_issues_play_on_start() {
        let (mut harness, keep_alive) = established();
        harness.config.auto_play = true;
        let mut phase = Streaming::new(keep_alive);
        harness.run(|ctx| phase.start(ctx)).unwrap();

        let outbox = harness.take_outbox();
        let [Message::Request(m7)] = outbox.as_slice() else {
            panic!("expected PLAY");
        };
        assert_eq!(m7.id, MessageId::M7);
        assert_eq!(m7.uri, URL);
        assert_eq!(m7.header.session.as_deref(), Some("6B8B4567"));
    }

    #[test]
    fn start_is_quiet_without_auto_play() {
        let (mut harness, keep_alive) = established();
        let mut phase = Streaming::new(keep_alive);
        harness.run(|ctx| phase.start(ctx)).unwrap();
        assert!(harness.take_outbox().is_empty());
    }

    #[test]
    fn triggers_map_to_commands() {
        for (method, expected) in [
            ("PLAY", MessageId::M7),
            ("PAUSE", MessageId::M9),
            ("TEARDOWN", MessageId::M8),
        ] {
            let (mut harness, keep_alive) = established();
            let mut phase = Streaming::new(keep_alive);
            harness.run(|ctx| phase.handle(ctx, trigger(5, method))).unwrap();

            let outbox = harness.take_outbox();
            let [Message::Response(ack), Message::Request(command)] = outbox.as_slice() else {
                panic!("expected reply then command for {}", method);
            };
            assert!(ack.is_ok());
            assert_eq!(command.id, expected);
            assert_eq!(command.method.as_str(), method);
        }
    }

    #[test]
    fn setup_trigger_fails_while_streaming() {
        let (mut harness, keep_alive) = established();
        let mut phase = Streaming::new(keep_alive);
        let result = harness.run(|ctx| phase.handle(ctx, trigger(5, "SETUP")));
        assert!(matches!(result, Err(WfdError::UnexpectedTrigger { .. })));
    }

    #[test]
    fn keep_alive_rearms_timer() {
        let (mut harness, keep_alive) = established();
        let first = keep_alive.current().unwrap();
        let mut phase = Streaming::new(keep_alive.clone());

        let keep_alive_request = request(Method::GetParameter, MessageId::M16, 9, "");
        harness.run(|ctx| phase.handle(ctx, Inbound::Request(keep_alive_request))).unwrap();

        let second = keep_alive.current().unwrap();
        assert_ne!(first, second);
        assert!(harness.delegate.released.lock().contains(&first));
        assert!(harness.delegate.created.lock().contains(&(second, 65)));

        let outbox = harness.take_outbox();
        let [Message::Response(reply)] = outbox.as_slice() else {
            panic!("expected keep-alive reply");
        };
        assert_eq!(reply.header.cseq, 9);
        assert_eq!(reply.header.session.as_deref(), Some("6B8B4567"));
    }

    #[test]
    fn confirmed_replies_drive_media() {
        let (mut harness, keep_alive) = established();
        let mut phase = Streaming::new(keep_alive);

        let play =
            harness.run(|ctx| phase.handle(ctx, Inbound::Reply(MessageId::M7, Response::ok())));
        assert_eq!(play.unwrap(), Progress::Continue);
        let pause =
            harness.run(|ctx| phase.handle(ctx, Inbound::Reply(MessageId::M9, Response::ok())));
        assert_eq!(pause.unwrap(), Progress::Continue);
        {
            let media = harness.media.state.lock();
            assert_eq!((media.plays, media.pauses), (1, 1));
        }

        let teardown =
            harness.run(|ctx| phase.handle(ctx, Inbound::Reply(MessageId::M8, Response::ok())));
        assert_eq!(teardown.unwrap(), Progress::Completed);
    }

    #[test]
    fn refused_play_fails() {
        let (mut harness, keep_alive) = established();
        let mut phase = Streaming::new(keep_alive);
        let reply = Inbound::Reply(MessageId::M7, Response::new(454, "Session Not Found"));
        let result = harness.run(|ctx| phase.handle(ctx, reply));
        assert!(matches!(
            result,
            Err(WfdError::Rejected {
                id: MessageId::M7,
                status: 454
            })
        ));
        assert_eq!(harness.media.state.lock().plays, 0);
    }

    #[test]
    fn keep_alive_lapse_is_claimed() {
        let (mut harness, keep_alive) = established();
        let timer = keep_alive.current().unwrap();
        let mut phase = Streaming::new(keep_alive);
        let outcome = harness.run(|ctx| phase.handle_timeout(ctx, timer));
        assert!(matches!(outcome, Some(Err(WfdError::KeepAliveExpired))));
    }
}
