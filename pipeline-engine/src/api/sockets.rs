use actix_web::web::{Data, Path, Payload};
use actix_web::{HttpRequest, HttpResponse};
use actix_ws::Message;
use futures::StreamExt;
use log::{info, warn};

use crate::data::pipeline_run::PipelineRunId;
use crate::notifier::PubSubNotifier;

/// `WS /sockets/pipeline-run-tasks/{run_id}`: a duplex channel pushing every status change for
/// tasks in `run_id`. The listener for the shared notify channel starts on the first subscriber
/// and stops on the last. Every task-status change is published as a plain decimal `run_id` on
/// that one shared channel and filtered client-side by `run_id`, rather than split across one
/// channel per run.
pub async fn pipeline_run_tasks<N>(
    req: HttpRequest,
    body: Payload,
    run_id: Path<PipelineRunId>,
    notifier: Data<N>,
    channel: Data<String>,
) -> actix_web::Result<HttpResponse>
where
    N: PubSubNotifier + Clone + 'static,
{
    let (response, mut session, mut msg_stream) = actix_ws::handle(&req, body)?;
    let run_id = run_id.into_inner();
    let channel_name = channel.as_ref().clone();
    let filter = run_id.to_string();

    let (subscriber_id, mut updates) = notifier
        .subscribe(&channel_name, filter)
        .await
        .map_err(actix_web::error::ErrorInternalServerError)?;

    let notifier = notifier.get_ref().clone();
    actix_web::rt::spawn(async move {
        loop {
            tokio::select! {
                update = updates.recv() => {
                    let Some(payload) = update else { break };
                    if session.text(payload).await.is_err() {
                        break;
                    }
                }
                incoming = msg_stream.next() => {
                    match incoming {
                        Some(Ok(Message::Ping(bytes))) => {
                            if session.pong(&bytes).await.is_err() {
                                break;
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Err(error)) => {
                            warn!("WebSocket error on run {run_id}: {error}");
                            break;
                        }
                        _ => {}
                    }
                }
            }
        }
        notifier.unsubscribe(&channel_name, subscriber_id).await;
        info!("WebSocket for run {run_id} closed, subscriber {subscriber_id} removed");
    });

    Ok(response)
}
