//! `RedisQueue` against a real Redis. Set `TEST_REDIS_URL` to run.
//!
//! Every test namespaces its keys under a fresh prefix and removes them at
//! the end.

mod support;

use std::time::Duration;

use prepwise_api::jobs::{
    InterviewJob, JobMessage, JobPayload, JobQueue, NackOutcome, QueueName, RedisQueue,
    ResumeJob,
};
use uuid::Uuid;

use support::{flush_prefix, redis_client, unique_prefix};

const SHORT_WAIT: Duration = Duration::from_millis(200);

async fn queue(client: &redis::Client, prefix: &str, visibility: Duration) -> RedisQueue {
    RedisQueue::connect(client.clone(), visibility)
        .await
        .expect("redis queue")
        .with_prefix(prefix)
}

fn resume_job() -> ResumeJob {
    let user_id = Uuid::new_v4();
    let resume_id = Uuid::new_v4();
    ResumeJob {
        resume_id,
        file_url: format!("memory://resumes/{user_id}/{resume_id}.pdf"),
        user_id,
        public_id: format!("resumes/{user_id}/{resume_id}.pdf"),
        file_name: "cv.pdf".to_string(),
    }
}

#[tokio::test]
async fn claimed_message_is_hidden_until_acked() {
    let Some(client) = redis_client() else {
        return;
    };
    let prefix = unique_prefix();
    let queue = queue(&client, &prefix, Duration::from_secs(60)).await;

    let message = JobMessage::new(JobPayload::ResumeAnalyse(resume_job()));
    queue.enqueue(&message).await.unwrap();

    let delivery = queue
        .claim(QueueName::ResumeAnalyse, SHORT_WAIT)
        .await
        .unwrap()
        .expect("message delivered");
    assert_eq!(delivery.message.id, message.id);
    assert!(queue
        .claim(QueueName::ResumeAnalyse, SHORT_WAIT)
        .await
        .unwrap()
        .is_none());

    queue.ack(&delivery).await.unwrap();
    assert_eq!(queue.requeue_expired(QueueName::ResumeAnalyse).await.unwrap(), 0);

    flush_prefix(&client, &prefix).await;
}

#[tokio::test]
async fn expired_lease_is_redelivered() {
    let Some(client) = redis_client() else {
        return;
    };
    let prefix = unique_prefix();
    let queue = queue(&client, &prefix, Duration::from_millis(200)).await;

    let message = JobMessage::new(JobPayload::ProcessResume(resume_job()));
    queue.enqueue(&message).await.unwrap();
    let abandoned = queue
        .claim(QueueName::ProcessResume, SHORT_WAIT)
        .await
        .unwrap()
        .expect("message delivered");

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(queue.requeue_expired(QueueName::ProcessResume).await.unwrap(), 1);

    let redelivered = queue
        .claim(QueueName::ProcessResume, SHORT_WAIT)
        .await
        .unwrap()
        .expect("message redelivered");
    assert_eq!(redelivered.message.id, abandoned.message.id);
    assert_eq!(redelivered.message.attempts, 0);

    flush_prefix(&client, &prefix).await;
}

#[tokio::test]
async fn nack_retries_indexing_and_dead_letters_feedback() {
    let Some(client) = redis_client() else {
        return;
    };
    let prefix = unique_prefix();
    let queue = queue(&client, &prefix, Duration::from_secs(60)).await;

    let indexing = JobMessage::new(JobPayload::ProcessResume(resume_job()));
    queue.enqueue(&indexing).await.unwrap();
    let delivery = queue
        .claim(QueueName::ProcessResume, SHORT_WAIT)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(
        queue.nack(&delivery).await.unwrap(),
        NackOutcome::Requeued { attempts: 1 }
    );
    let retry = queue
        .claim(QueueName::ProcessResume, SHORT_WAIT)
        .await
        .unwrap()
        .expect("retry delivered");
    assert_eq!(retry.message.id, indexing.id);
    assert_eq!(retry.message.attempts, 1);

    let feedback = JobMessage::new(JobPayload::InterviewFeedback(InterviewJob {
        interview_id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
    }));
    queue.enqueue(&feedback).await.unwrap();
    let delivery = queue
        .claim(QueueName::InterviewFeedback, SHORT_WAIT)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(queue.nack(&delivery).await.unwrap(), NackOutcome::DeadLettered);
    assert!(queue
        .claim(QueueName::InterviewFeedback, SHORT_WAIT)
        .await
        .unwrap()
        .is_none());

    let mut conn = client.get_multiplexed_tokio_connection().await.unwrap();
    let dead: i64 = redis::cmd("LLEN")
        .arg(format!("{prefix}:interview-feedback:dead"))
        .query_async(&mut conn)
        .await
        .unwrap();
    assert_eq!(dead, 1);

    flush_prefix(&client, &prefix).await;
}
