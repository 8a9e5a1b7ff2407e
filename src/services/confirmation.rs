use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use parking_lot::Mutex;
use reqwest_eventsource::{Event, EventSource};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::app::config::Config;
use crate::models::session::{CheckoutStep, ConfirmationState};
use crate::models::status::StatusPayload;
use crate::services::checkout::{CheckoutEvent, CheckoutSession, EventsTx};
use crate::services::gateway::PaymentGatewayClient;

/// Tudo que um canal de confirmação precisa carregar consigo.
#[derive(Clone)]
struct ChannelContext {
    session: Arc<Mutex<CheckoutSession>>,
    gateway: Arc<PaymentGatewayClient>,
    events: EventsTx,
    order_id: String,
    stop_tx: watch::Sender<bool>,
    poll_interval: Duration,
    reconnect_delay: Duration,
    redirect_delay: Duration,
    success_redirect: String,
}

/// Liga os dois canais de confirmação de um pedido: o stream de eventos do
/// gateway e o poll de segurança. Chamadas repetidas para o mesmo pedido
/// com canais vivos não fazem nada; pedido novo derruba os canais antigos.
pub(crate) fn subscribe(
    session: &Arc<Mutex<CheckoutSession>>,
    gateway: &Arc<PaymentGatewayClient>,
    config: &Arc<Config>,
    events: &EventsTx,
    order_id: &str,
) {
    {
        let s = session.lock();
        if s.closed {
            debug!(order_id = %order_id, "session closed, not subscribing");
            return;
        }
        if s.channels_alive_for(order_id) {
            debug!(order_id = %order_id, "confirmation channels already running");
            return;
        }
    }
    teardown_channels(session);

    let (stop_tx, stop_rx) = watch::channel(false);
    let ctx = ChannelContext {
        session: session.clone(),
        gateway: gateway.clone(),
        events: events.clone(),
        order_id: order_id.to_string(),
        stop_tx: stop_tx.clone(),
        poll_interval: Duration::from_millis(config.poll_interval_ms),
        reconnect_delay: Duration::from_millis(config.sse_reconnect_delay_ms),
        redirect_delay: Duration::from_millis(config.redirect_delay_ms),
        success_redirect: config.success_redirect.clone(),
    };

    let push_task = tokio::spawn(run_push_channel(ctx.clone(), stop_rx.clone()));
    let poll_task = tokio::spawn(run_poll_channel(ctx, stop_rx));

    {
        let mut s = session.lock();
        // um close no meio da montagem ganha: os canais recém-criados morrem aqui
        if s.closed {
            drop(s);
            let _ = stop_tx.send(true);
            push_task.abort();
            poll_task.abort();
            return;
        }
        s.order_id = Some(order_id.to_string());
        s.stop_tx = Some(stop_tx);
        s.push_task = Some(push_task);
        s.poll_task = Some(poll_task);
    }
    info!(order_id = %order_id, "confirmation channels started");
}

/// Derruba os canais da sessão. O sinal de parada e os aborts acontecem
/// fora do lock.
pub(crate) fn teardown_channels(session: &Arc<Mutex<CheckoutSession>>) {
    let (stop_tx, push_task, poll_task, redirect_task) = {
        let mut s = session.lock();
        (
            s.stop_tx.take(),
            s.push_task.take(),
            s.poll_task.take(),
            s.redirect_task.take(),
        )
    };
    if let Some(stop) = stop_tx {
        let _ = stop.send(true);
    }
    for task in [push_task, poll_task, redirect_task].into_iter().flatten() {
        task.abort();
    }
}

/// Canal primário: stream de eventos do gateway, reconectando até o pedido
/// liquidar ou alguém pedir parada.
async fn run_push_channel(ctx: ChannelContext, mut stop_rx: watch::Receiver<bool>) {
    loop {
        if *stop_rx.borrow() {
            return;
        }

        match EventSource::new(ctx.gateway.stream_request(&ctx.order_id)) {
            Ok(mut es) => loop {
                tokio::select! {
                    _ = stop_rx.changed() => {
                        if *stop_rx.borrow() {
                            es.close();
                            return;
                        }
                    }
                    event = es.next() => match event {
                        Some(Ok(Event::Open)) => {
                            debug!(order_id = %ctx.order_id, "status stream open");
                        }
                        Some(Ok(Event::Message(msg))) => {
                            match serde_json::from_str::<StatusPayload>(&msg.data) {
                                Ok(payload) => {
                                    if observe_status(&ctx, &payload) {
                                        es.close();
                                        return;
                                    }
                                }
                                Err(e) => {
                                    warn!(error = %e, "discarding unparseable status event");
                                }
                            }
                        }
                        Some(Err(e)) => {
                            warn!(order_id = %ctx.order_id, error = %e, "status stream error");
                            break;
                        }
                        None => {
                            info!(order_id = %ctx.order_id, "status stream closed by server");
                            break;
                        }
                    }
                }
            },
            Err(e) => warn!(error = %e, "failed to open status stream"),
        }

        // espera antes de reconectar, obedecendo o sinal de parada
        tokio::select! {
            _ = stop_rx.changed() => {
                if *stop_rx.borrow() {
                    return;
                }
            }
            _ = tokio::time::sleep(ctx.reconnect_delay) => {}
        }
    }
}

/// Canal de segurança: consulta o status direto, caso o stream perca o
/// evento. Erros aqui são transitórios, a próxima volta tenta de novo.
async fn run_poll_channel(ctx: ChannelContext, mut stop_rx: watch::Receiver<bool>) {
    loop {
        tokio::select! {
            _ = stop_rx.changed() => {
                if *stop_rx.borrow() {
                    return;
                }
            }
            _ = tokio::time::sleep(ctx.poll_interval) => {
                match ctx.gateway.status(&ctx.order_id).await {
                    Ok(status) => {
                        if observe_status(&ctx, &status.payload) {
                            return;
                        }
                    }
                    Err(e) => {
                        debug!(order_id = %ctx.order_id, error = %e, "status poll failed");
                    }
                }
            }
        }
    }
}

/// Ponto único por onde qualquer status observado passa, venha do stream ou
/// do poll. Devolve `true` quando o pedido liquidou e o canal deve encerrar.
/// O primeiro canal a ver um status terminal marca a parada; o outro só
/// encerra, sem repetir efeitos.
fn observe_status(ctx: &ChannelContext, payload: &StatusPayload) -> bool {
    let state = payload.normalized();
    debug!(order_id = %ctx.order_id, state = ?state, "status observed");
    if !state.is_terminal() {
        return false;
    }

    let claimed = ctx.stop_tx.send_if_modified(|stopped| {
        if *stopped {
            false
        } else {
            *stopped = true;
            true
        }
    });
    if !claimed {
        return true;
    }

    if state.is_approved() {
        let countdown = {
            let mut s = ctx.session.lock();
            // sessão fechada no meio do caminho: encerra sem efeito algum
            if s.closed {
                return true;
            }
            s.approved = true;
            s.confirmation = ConfirmationState::Approved;
            s.step = CheckoutStep::Confirming;
            s.paying = false;

            // o redirecionamento nasce no mesmo lock que marca a aprovação
            let events = ctx.events.clone();
            let delay = ctx.redirect_delay;
            let to = ctx.success_redirect.clone();
            s.redirect_task = Some(tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let _ = events.send(CheckoutEvent::Redirect { to });
            }));
            s.countdown_task.take()
        };
        if let Some(task) = countdown {
            task.abort();
        }
        info!(order_id = %ctx.order_id, "payment approved");
        let _ = ctx.events.send(CheckoutEvent::Approved {
            order_id: ctx.order_id.clone(),
        });
    } else {
        {
            let mut s = ctx.session.lock();
            if s.closed {
                return true;
            }
            s.paying = false;
            s.step = CheckoutStep::PaymentSubmit;
            s.confirmation = ConfirmationState::Idle;
        }
        warn!(order_id = %ctx.order_id, state = ?state, "payment not approved");
        let _ = ctx.events.send(CheckoutEvent::Failed {
            message: "Pagamento não aprovado. Verifique os dados e tente novamente.".to_string(),
            retryable: true,
        });
    }
    true
}
